//! Type-directed binding of properties into typed configuration.
//!
//! A [`Binder`] walks the [`Shape`] a type describes through [`Describe`]
//! and fills it from a [`bindery_core::PropertySource`]: scalars are resolved
//! and converted, sequences come from `key[i]` entries or a delimited string,
//! mappings from the sub-keys of a prefix, and structs field by field from
//! their value tags. Converters, splitters and validators are pluggable
//! through registries handed to the [`BinderBuilder`].

#![warn(missing_docs, clippy::pedantic)]

extern crate self as bindery_bind;

mod binder;
mod convert;
mod expr;
mod registry;
mod shape;

/// Binder entry points and configuration.
pub use binder::{Binder, BinderBuilder, ContainerValidation};
/// Built-in scalar and duration parsing.
pub use convert::{ParseError, parse_duration, parse_primitive};
/// Boolean expressions over bound values.
pub use expr::{ExprValidator, eval_bool};
/// Converter, splitter and validator registries.
pub use registry::{
    ConvertFn, ConverterRegistry, RegistryError, SplitFn, SplitterRegistry, Validator,
    ValidatorRegistry,
};
/// Shape descriptors and the `Describe` trait.
pub use shape::{Describe, FieldBinding, FieldSpec, Primitive, Shape, ShapeFn, ShapeKind, TypeKey};

/// Derives [`Describe`] for structs with named fields.
///
/// Field attributes:
/// - `#[value("${key:=default}||splitter")]` binds the field from a value tag
///   relative to the struct's key.
/// - `#[bind(embed)]` flattens a nested struct onto the parent's key.
/// - `#[bind(skip)]` leaves the field out; pair it with `#[serde(default)]`.
/// - `#[validate(expr = "$ > 0")]` attaches a rule for the named validator.
///
/// Fields without `#[value]` bind under their own name. An embedded field
/// must itself be a struct; anything else fails with `UnsupportedShape`.
///
/// The container attribute `#[describe(crate = "path")]` replaces the
/// `::bindery_bind` prefix of the generated code, e.g. `"bindery::bind"`.
pub use bindery_macros::Describe;

pub use bindery_core::{BindTarget, Error, ErrorKind, Properties, PropertySource, Result};
