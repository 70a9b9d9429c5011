//! Named and type-keyed registries consulted by the binder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bindery_core::BoxError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::convert::parse_duration;
use crate::expr::ExprValidator;
use crate::shape::TypeKey;

/// Errors produced while filling a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An entry with the same name or type already exists.
    #[error("{kind} `{name}` is already registered")]
    Duplicate {
        /// Registry kind, e.g. `splitter`.
        kind: &'static str,
        /// Name of the offending entry.
        name: String,
    },

    /// Entry names must not be blank.
    #[error("{kind} name cannot be empty")]
    EmptyName {
        /// Registry kind, e.g. `splitter`.
        kind: &'static str,
    },
}

/// Type-erased converter from a resolved string to a JSON value.
pub type ConvertFn = Arc<dyn Fn(&str) -> Result<Value, BoxError> + Send + Sync>;

/// Type-erased splitter from a delimited string to its elements.
pub type SplitFn = Arc<dyn Fn(&str) -> Result<Vec<String>, BoxError> + Send + Sync>;

/// Converters keyed by the type they produce.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    inner: HashMap<TypeKey, ConvertFn>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.inner.keys().map(|key| key.name()).collect();
        f.debug_struct("ConverterRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ConverterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the [`Duration`] converter.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let duration: ConvertFn = Arc::new(|text: &str| {
            let duration = parse_duration(text)?;
            Ok(serde_json::to_value(duration)?)
        });
        registry.inner.insert(TypeKey::of::<Duration>(), duration);
        registry
    }

    /// Registers the converter producing `T`.
    ///
    /// The converter takes precedence over the built-in handling of `T`,
    /// including struct binding.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if `T` already has a converter.
    pub fn register<T, F, E>(&mut self, convert: F) -> Result<(), RegistryError>
    where
        T: Serialize + 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let key = TypeKey::of::<T>();
        if self.inner.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                kind: "converter",
                name: key.name().to_owned(),
            });
        }
        self.inner.insert(
            key,
            Arc::new(move |text: &str| {
                let value = convert(text).map_err(Into::into)?;
                Ok(serde_json::to_value(value)?)
            }),
        );
        Ok(())
    }

    /// Returns `true` if a converter produces the keyed type.
    #[must_use]
    pub fn contains(&self, key: TypeKey) -> bool {
        self.inner.contains_key(&key)
    }

    /// Returns the converter producing the keyed type.
    #[must_use]
    pub fn get(&self, key: TypeKey) -> Option<&ConvertFn> {
        self.inner.get(&key)
    }
}

/// Splitters keyed by the name used after `||` in a value tag.
#[derive(Clone, Default)]
pub struct SplitterRegistry {
    inner: HashMap<String, SplitFn>,
}

impl fmt::Debug for SplitterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.inner.keys().cloned().collect();
        f.debug_struct("SplitterRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl SplitterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a splitter under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] for a blank name and
    /// [`RegistryError::Duplicate`] if the name is taken.
    pub fn register<F, E>(&mut self, name: impl Into<String>, split: F) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> Result<Vec<String>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let name = checked_name("splitter", name.into(), |n| self.inner.contains_key(n))?;
        self.inner.insert(
            name,
            Arc::new(move |text: &str| split(text).map_err(Into::into)),
        );
        Ok(())
    }

    /// Returns the splitter registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SplitFn> {
        self.inner.get(name)
    }
}

/// Checks a converted value against a rule.
///
/// `Ok(false)` rejects the value; `Err` reports a rule that could not be
/// evaluated.
pub trait Validator: Send + Sync {
    /// Returns whether `value` satisfies `rule`.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule itself cannot be evaluated.
    fn validate(&self, rule: &str, value: &Value) -> Result<bool, BoxError>;
}

impl<F> Validator for F
where
    F: Fn(&str, &Value) -> Result<bool, BoxError> + Send + Sync,
{
    fn validate(&self, rule: &str, value: &Value) -> Result<bool, BoxError> {
        (self)(rule, value)
    }
}

/// Validators keyed by rule name, e.g. `expr`.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    inner: HashMap<String, Arc<dyn Validator>>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.inner.keys().cloned().collect();
        f.debug_struct("ValidatorRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the `expr` validator.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .inner
            .insert("expr".to_owned(), Arc::new(ExprValidator));
        registry
    }

    /// Registers a validator under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] for a blank name and
    /// [`RegistryError::Duplicate`] if the name is taken.
    pub fn register<V>(&mut self, name: impl Into<String>, validator: V) -> Result<(), RegistryError>
    where
        V: Validator + 'static,
    {
        let name = checked_name("validator", name.into(), |n| self.inner.contains_key(n))?;
        self.inner.insert(name, Arc::new(validator));
        Ok(())
    }

    /// Returns the validator registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Validator> {
        self.inner.get(name).map(|validator| validator.as_ref())
    }
}

fn checked_name(
    kind: &'static str,
    name: String,
    taken: impl Fn(&str) -> bool,
) -> Result<String, RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::EmptyName { kind });
    }
    if taken(&name) {
        return Err(RegistryError::Duplicate { kind, name });
    }
    Ok(name)
}
