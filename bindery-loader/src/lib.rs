//! Loading raw configuration into a bindery property store.
//!
//! Resources are found by a [`ResourceLocator`], parsed by [`Format`]
//! according to their extension, and merged by a [`PropertyLoader`] together
//! with prefixed environment variables.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod format;
mod loader;
mod resource;

/// Error type and result alias.
pub use error::{LoaderError, LoaderResult};
/// Supported file formats.
pub use format::Format;
/// Property accumulation from files and the environment.
pub use loader::PropertyLoader;
/// Resource lookup.
pub use resource::{FileResourceLocator, Resource, ResourceLocator};
