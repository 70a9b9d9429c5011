//! Typed property binding and ordered configuration units.
//!
//! This facade bundles the bindery crates behind feature flags. The property
//! store and the binder are always available; conditions, configers and the
//! file loader can be switched off.
//!
//! `#[derive(Describe)]` expands to paths under `bindery_bind`. Crates that
//! only depend on this facade add `#[describe(crate = "bindery::bind")]`.

#![warn(missing_docs, clippy::pedantic)]

/// Property store, value tags and placeholder resolution.
pub use bindery_core as store;

/// Type-directed binding and its registries.
pub use bindery_bind as bind;

pub use bindery_bind::{Binder, Describe, Error, ErrorKind, Properties, PropertySource, Result};

/// Activation conditions (enabled by `cond` feature).
#[cfg(feature = "cond")]
pub use bindery_cond as cond;

/// Configuration units and their ordering (enabled by `configer` feature).
#[cfg(feature = "configer")]
pub use bindery_configer as configer;

/// Resource location and property loading (enabled by `loader` feature).
#[cfg(feature = "loader")]
pub use bindery_loader as loader;
