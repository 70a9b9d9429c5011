//! Ordered, conditionally gated configuration units.
//!
//! A [`Configer`] wraps a function whose parameters are bound from value
//! tags, a [`bindery_cond::Conditional`] deciding whether it runs, and
//! `before`/`after` constraints against other configers. A
//! [`ConfigerGraph`] sorts the registered configers depth first, reports
//! cycles with the full chain of names, and runs each active configer once.

#![warn(missing_docs, clippy::pedantic)]

mod args;
mod configer;
mod error;
mod graph;

/// Functions with tag-bound parameters.
pub use args::ConfigFn;
/// Configuration unit and its builder surface.
pub use configer::Configer;
/// Error type and result alias.
pub use error::{ConfigerError, ConfigerResult};
/// Registration, sorting and execution.
pub use graph::{ConfigerGraph, RunReport};
