//! Loader error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or parsing configuration resources.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A resource exists but could not be read.
    #[error("cannot read `{}`", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file extension does not name a known format.
    #[error("unsupported configuration format for `{name}`")]
    UnsupportedFormat {
        /// Resource name.
        name: String,
    },

    /// A `.properties` line has no separator.
    #[error("{name}:{line}: expected `key=value` or `key: value`")]
    PropertiesSyntax {
        /// Resource name.
        name: String,
        /// One-based line number.
        line: usize,
    },

    /// A JSON document is malformed.
    #[error("cannot parse JSON resource `{name}`")]
    Json {
        /// Resource name.
        name: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A TOML document is malformed.
    #[error("cannot parse TOML resource `{name}`")]
    Toml {
        /// Resource name.
        name: String,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },

    /// Parsed entries could not be stored.
    #[error("cannot store properties of `{name}`")]
    Store {
        /// Resource name.
        name: String,
        /// Store error, usually a key conflict.
        #[source]
        source: bindery_core::Error,
    },
}

/// Result alias for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
