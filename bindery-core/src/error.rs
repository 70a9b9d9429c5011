//! Shared error definitions for property resolution and binding.

use thiserror::Error;

/// Boxed error returned by user supplied converters, splitters and validators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout bindery.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required property and its default are both absent.
    NotExist,
    /// Malformed tag, key, or unbalanced placeholder braces.
    InvalidSyntax,
    /// A string could not be converted into the target type.
    Conversion,
    /// A converted value was rejected by a validator.
    Validation,
    /// The target shape cannot be bound in the requested way.
    UnsupportedShape,
    /// A delimited string could not be split into sequence elements.
    Split,
    /// A property key collides with an existing leaf or container.
    PropertyConflict,
}

/// Errors raised while storing, resolving or binding properties.
#[derive(Debug, Error)]
pub enum Error {
    /// Required property is missing and no default applies.
    #[error("property `{key}` does not exist{}", at(.path))]
    NotExist {
        /// Full dotted key that was looked up.
        key: String,
        /// Diagnostic path of the binding target.
        path: String,
    },

    /// Input could not be parsed.
    #[error("invalid syntax in `{input}`: {reason}{}", at(.path))]
    InvalidSyntax {
        /// The offending tag, key or value.
        input: String,
        /// Human-readable reason for rejection.
        reason: String,
        /// Diagnostic path of the binding target.
        path: String,
    },

    /// Resolved string could not be converted into the target type.
    #[error("cannot convert `{value}` of property `{key}` to {target}{}", at(.path))]
    Conversion {
        /// Full dotted key that was bound.
        key: String,
        /// Diagnostic path of the binding target.
        path: String,
        /// Name of the target type.
        target: String,
        /// The resolved string value.
        value: String,
        /// Underlying parse or converter error.
        #[source]
        source: BoxError,
    },

    /// Converted value failed a named validator.
    #[error("validate {path}: {tag} rule `{rule}` rejected value {value}")]
    Validation {
        /// Full dotted key that was bound.
        key: String,
        /// Diagnostic path of the binding target.
        path: String,
        /// Validator tag name, e.g. `expr`.
        tag: String,
        /// Validator rule content.
        rule: String,
        /// Rendered value that was rejected.
        value: String,
        /// Error raised by the validator, if it failed rather than returned false.
        #[source]
        source: Option<BoxError>,
    },

    /// Target shape is not supported by the binder in this position.
    #[error("unsupported binding for property `{key}`: {reason}{}", at(.path))]
    UnsupportedShape {
        /// Full dotted key that was bound.
        key: String,
        /// Diagnostic path of the binding target.
        path: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Splitting a delimited value failed.
    #[error("cannot split property `{key}` with splitter `{splitter}`{}", at(.path))]
    Split {
        /// Full dotted key that was bound.
        key: String,
        /// Diagnostic path of the binding target.
        path: String,
        /// Name of the splitter.
        splitter: String,
        /// Underlying splitter error.
        #[source]
        source: BoxError,
    },

    /// Property key collides with an existing leaf or container.
    #[error("property `{key}` conflicts: {reason}")]
    PropertyConflict {
        /// The offending key.
        key: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

fn at(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" (bind {path})")
    }
}

impl Error {
    /// Creates an [`Error::InvalidSyntax`] without a binding path.
    #[must_use]
    pub fn syntax(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            input: input.into(),
            reason: reason.into(),
            path: String::new(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotExist { .. } => ErrorKind::NotExist,
            Self::InvalidSyntax { .. } => ErrorKind::InvalidSyntax,
            Self::Conversion { .. } => ErrorKind::Conversion,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UnsupportedShape { .. } => ErrorKind::UnsupportedShape,
            Self::Split { .. } => ErrorKind::Split,
            Self::PropertyConflict { .. } => ErrorKind::PropertyConflict,
        }
    }

    /// Returns `true` when the error reports a missing property.
    #[must_use]
    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    /// Returns the diagnostic binding path, empty when none was recorded.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::NotExist { path, .. }
            | Self::InvalidSyntax { path, .. }
            | Self::Conversion { path, .. }
            | Self::Validation { path, .. }
            | Self::UnsupportedShape { path, .. }
            | Self::Split { path, .. } => path,
            Self::PropertyConflict { .. } => "",
        }
    }

    /// Records `path` on errors that were raised without one.
    #[must_use]
    pub fn at_path(mut self, target: &str) -> Self {
        match &mut self {
            Self::NotExist { path, .. }
            | Self::InvalidSyntax { path, .. }
            | Self::Conversion { path, .. }
            | Self::Validation { path, .. }
            | Self::UnsupportedShape { path, .. }
            | Self::Split { path, .. } => {
                if path.is_empty() {
                    target.clone_into(path);
                }
            }
            Self::PropertyConflict { .. } => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_attached_once() {
        let err = Error::NotExist {
            key: "a.b".into(),
            path: String::new(),
        }
        .at_path("Config.b")
        .at_path("Outer.inner");

        assert_eq!(err.path(), "Config.b");
        assert!(err.is_not_exist());
        assert_eq!(
            err.to_string(),
            "property `a.b` does not exist (bind Config.b)"
        );
    }

    #[test]
    fn display_omits_empty_path() {
        let err = Error::syntax("${a", "unbalanced braces");
        assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
        assert_eq!(err.to_string(), "invalid syntax in `${a`: unbalanced braces");
    }
}
