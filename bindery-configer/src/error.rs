//! Errors raised while registering, ordering and running configers.

use bindery_cond::CondError;
use bindery_core::BoxError;
use thiserror::Error;

/// Errors produced by configers and the configer graph.
#[derive(Debug, Error)]
pub enum ConfigerError {
    /// Configer names must not be blank.
    #[error("configer name cannot be empty")]
    EmptyName,

    /// A configer with the same name is already registered.
    #[error("configer `{name}` is already registered")]
    Duplicate {
        /// Name of the offending configer.
        name: String,
    },

    /// The number of argument tags does not match the function parameters.
    #[error("configer `{name}` takes {expected} arguments but {found} tags were given")]
    Arity {
        /// Name of the offending configer.
        name: String,
        /// Number of function parameters.
        expected: usize,
        /// Number of supplied tags.
        found: usize,
    },

    /// Precedence constraints form a cycle.
    #[error("found cycle config: {}", chain.join(" -> "))]
    Cycle {
        /// Names along the cycle; the first name is repeated at the end.
        chain: Vec<String>,
    },

    /// The activation condition could not be evaluated.
    #[error("condition of configer `{name}` failed")]
    Condition {
        /// Name of the configer.
        name: String,
        /// Underlying evaluation error.
        #[source]
        source: CondError,
    },

    /// An argument could not be bound.
    #[error("cannot bind arguments of configer `{name}`")]
    Bind {
        /// Name of the configer.
        name: String,
        /// Underlying binding error.
        #[source]
        source: bindery_core::Error,
    },

    /// The configer function returned an error.
    #[error("configer `{name}` failed")]
    Execution {
        /// Name of the configer.
        name: String,
        /// Error returned by the function.
        #[source]
        source: BoxError,
    },
}

impl ConfigerError {
    /// Returns the cycle chain when the error reports a cycle.
    #[must_use]
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            Self::Cycle { chain } => Some(chain),
            _ => None,
        }
    }
}

/// Result alias for configer operations.
pub type ConfigerResult<T> = Result<T, ConfigerError>;
