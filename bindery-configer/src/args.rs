//! Functions whose parameters are bound from value tags.

use bindery_bind::{Binder, Describe};
use bindery_core::{BindTarget, BoxError, PropertySource};
use serde::de::DeserializeOwned;

use crate::error::{ConfigerError, ConfigerResult};

/// A function a configer can run, one value tag per parameter.
///
/// Implemented for closures of up to four parameters returning
/// `Result<(), E>`. `Args` is the parameter tuple and only disambiguates the
/// implementations.
pub trait ConfigFn<Args>: Send + 'static {
    /// Number of parameters, which must equal the number of tags.
    const ARITY: usize;

    /// Binds every parameter from `tags` and invokes the function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::Bind`] when a parameter cannot be bound and
    /// [`ConfigerError::Execution`] when the function fails.
    fn call(
        self,
        binder: &Binder,
        source: &dyn PropertySource,
        tags: &[String],
        name: &str,
    ) -> ConfigerResult<()>;
}

fn bind_arg<T>(
    binder: &Binder,
    source: &dyn PropertySource,
    tags: &[String],
    index: usize,
    name: &str,
) -> ConfigerResult<T>
where
    T: Describe + DeserializeOwned,
{
    let Some(tag) = tags.get(index) else {
        return Err(ConfigerError::Arity {
            name: name.to_owned(),
            expected: index + 1,
            found: tags.len(),
        });
    };
    let bind_error = |source| ConfigerError::Bind {
        name: name.to_owned(),
        source,
    };
    let target = BindTarget::from_tag(tag, format!("{name}.arg{index}")).map_err(bind_error)?;
    binder.bind_target(source, &target).map_err(bind_error)
}

fn execution_error(name: &str, err: impl Into<BoxError>) -> ConfigerError {
    ConfigerError::Execution {
        name: name.to_owned(),
        source: err.into(),
    }
}

macro_rules! impl_config_fn {
    ($arity:expr; $($ty:ident $val:ident $idx:tt),*) => {
        impl<F, E, $($ty,)*> ConfigFn<($($ty,)*)> for F
        where
            F: FnOnce($($ty),*) -> Result<(), E> + Send + 'static,
            E: Into<BoxError>,
            $($ty: Describe + DeserializeOwned,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_variables)]
            fn call(
                self,
                binder: &Binder,
                source: &dyn PropertySource,
                tags: &[String],
                name: &str,
            ) -> ConfigerResult<()> {
                $(let $val = bind_arg::<$ty>(binder, source, tags, $idx, name)?;)*
                self($($val),*).map_err(|err| execution_error(name, err))
            }
        }
    };
}

impl_config_fn!(0;);
impl_config_fn!(1; A a 0);
impl_config_fn!(2; A a 0, B b 1);
impl_config_fn!(3; A a 0, B b 1, C c 2);
impl_config_fn!(4; A a 0, B b 1, C c 2, D d 3);
