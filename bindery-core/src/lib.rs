//! Core shared types for bindery.
//!
//! This crate owns the flat property store, the `${key:=default}||splitter`
//! value tag, and the placeholder resolver that expands references inside
//! property values. Typed binding and configuration ordering build on top of
//! these primitives.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod properties;
mod resolve;
mod tag;

/// Error type and result alias shared across the workspace.
pub use error::{BoxError, Error, ErrorKind, Result};
/// Flat property store and the read surface consumed by the binder.
pub use properties::{Overlay, Properties, PropertySource};
/// Placeholder expansion against a property source.
pub use resolve::Resolver;
/// Value tag parsing and the per-call binding target.
pub use tag::{ANONYMOUS_KEY, BindTarget, ParsedTag, ROOT_KEY, Rule};
