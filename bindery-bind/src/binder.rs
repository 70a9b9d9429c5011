//! Type-directed binding of properties into JSON-shaped values.

use std::any::type_name;

use bindery_core::{
    BindTarget, BoxError, Error, Overlay, Properties, PropertySource, Resolver, Result, Rule,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::convert::parse_primitive;
use crate::registry::{ConverterRegistry, SplitterRegistry, ValidatorRegistry};
use crate::shape::{Describe, FieldBinding, FieldSpec, Shape, ShapeFn, ShapeKind};

/// Where rules attached to a sequence or mapping are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContainerValidation {
    /// The rules see the whole bound container.
    #[default]
    Container,
    /// The rules see every element, the container itself is not checked.
    Elements,
    /// The rules see every element and then the whole container.
    Both,
}

impl ContainerValidation {
    fn checks_container(self) -> bool {
        matches!(self, Self::Container | Self::Both)
    }

    fn checks_elements(self) -> bool {
        matches!(self, Self::Elements | Self::Both)
    }
}

/// Builder for [`Binder`].
#[derive(Debug)]
pub struct BinderBuilder {
    converters: ConverterRegistry,
    splitters: SplitterRegistry,
    validators: ValidatorRegistry,
    container_validation: ContainerValidation,
}

impl Default for BinderBuilder {
    fn default() -> Self {
        Self {
            converters: ConverterRegistry::with_defaults(),
            splitters: SplitterRegistry::new(),
            validators: ValidatorRegistry::with_defaults(),
            container_validation: ContainerValidation::default(),
        }
    }
}

impl BinderBuilder {
    /// Replaces the converter registry.
    #[must_use]
    pub fn converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    /// Replaces the splitter registry.
    #[must_use]
    pub fn splitters(mut self, splitters: SplitterRegistry) -> Self {
        self.splitters = splitters;
        self
    }

    /// Replaces the validator registry.
    #[must_use]
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Chooses where container rules are checked.
    #[must_use]
    pub fn container_validation(mut self, mode: ContainerValidation) -> Self {
        self.container_validation = mode;
        self
    }

    /// Finalises the binder.
    #[must_use]
    pub fn build(self) -> Binder {
        Binder {
            converters: self.converters,
            splitters: self.splitters,
            validators: self.validators,
            container_validation: self.container_validation,
        }
    }
}

/// Fills typed values from a [`PropertySource`].
///
/// Binding walks the target's [`Shape`] and produces a JSON value, which is
/// then deserialized into the requested type. Field names in the bound
/// object are the Rust field names.
#[derive(Clone, Debug)]
pub struct Binder {
    converters: ConverterRegistry,
    splitters: SplitterRegistry,
    validators: ValidatorRegistry,
    container_validation: ContainerValidation,
}

impl Default for Binder {
    fn default() -> Self {
        BinderBuilder::default().build()
    }
}

impl Binder {
    /// Starts a builder preloaded with the default converters and validators.
    #[must_use]
    pub fn builder() -> BinderBuilder {
        BinderBuilder::default()
    }

    /// Registered converters.
    #[must_use]
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Registered splitters.
    #[must_use]
    pub fn splitters(&self) -> &SplitterRegistry {
        &self.splitters
    }

    /// Registered validators.
    #[must_use]
    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Binds `T` from the properties selected by a value tag.
    ///
    /// `${ROOT}` binds from the top of the store. Diagnostic paths start at the
    /// short type name of `T`.
    ///
    /// # Errors
    ///
    /// Returns the first resolution, conversion or validation error, carrying
    /// the path of the offending field.
    pub fn bind<T>(&self, source: &dyn PropertySource, tag: &str) -> Result<T>
    where
        T: Describe + DeserializeOwned,
    {
        let target = BindTarget::from_tag(tag, short_type_name::<T>())?;
        self.bind_target(source, &target)
    }

    /// Binds `T` at an explicit target.
    ///
    /// # Errors
    ///
    /// See [`Binder::bind`].
    pub fn bind_target<T>(&self, source: &dyn PropertySource, target: &BindTarget) -> Result<T>
    where
        T: Describe + DeserializeOwned,
    {
        let value = self.bind_value(source, &T::shape(), target)?;
        debug!(key = target.key(), path = target.path(), "bound {}", type_name::<T>());
        deserialize(&value, target)
    }

    /// Binds into an existing value.
    ///
    /// Fields that bind to `null`, such as optional fields whose property is
    /// absent, keep their current value.
    ///
    /// # Errors
    ///
    /// See [`Binder::bind`].
    pub fn bind_into<T>(&self, source: &dyn PropertySource, tag: &str, current: &mut T) -> Result<()>
    where
        T: Describe + Serialize + DeserializeOwned,
    {
        let target = BindTarget::from_tag(tag, short_type_name::<T>())?;
        let bound = self.bind_value(source, &T::shape(), &target)?;
        let mut merged = serde_json::to_value(&*current).map_err(|err| Error::Conversion {
            key: target.key().to_owned(),
            path: target.path().to_owned(),
            target: type_name::<T>().to_owned(),
            value: String::new(),
            source: Box::new(err),
        })?;
        merge(&mut merged, bound);
        *current = deserialize(&merged, &target)?;
        Ok(())
    }

    /// Binds one shape at `target`, producing its JSON form.
    ///
    /// # Errors
    ///
    /// See [`Binder::bind`].
    pub fn bind_value(
        &self,
        source: &dyn PropertySource,
        shape: &Shape,
        target: &BindTarget,
    ) -> Result<Value> {
        match shape.kind() {
            ShapeKind::Mapping(element) => self.bind_mapping(source, *element, target),
            ShapeKind::Sequence(element) => self.bind_sequence(source, *element, target),
            ShapeKind::Optional(inner) => match self.bind_value(source, &inner(), target) {
                Err(err) if err.is_not_exist() && !source.has(target.key()) => Ok(Value::Null),
                other => other,
            },
            ShapeKind::Composite(fields) if !self.converters.contains(shape.type_key()) => {
                self.bind_composite(source, fields, target)
            }
            _ => self.bind_leaf(source, shape, target),
        }
    }

    fn bind_leaf(
        &self,
        source: &dyn PropertySource,
        shape: &Shape,
        target: &BindTarget,
    ) -> Result<Value> {
        let text = Resolver::new(source)
            .resolve(target)
            .map_err(|err| err.at_path(target.path()))?;

        let converted = if let Some(convert) = self.converters.get(shape.type_key()) {
            convert(&text)
        } else if let ShapeKind::Primitive(Some(primitive)) = shape.kind() {
            parse_primitive(*primitive, &text).map_err(Into::into)
        } else {
            return Err(Error::UnsupportedShape {
                key: target.key().to_owned(),
                path: target.path().to_owned(),
                reason: format!("unsupported bind type `{}`", shape.type_key().name()),
            });
        };
        let value = converted.map_err(|source| Error::Conversion {
            key: target.key().to_owned(),
            path: target.path().to_owned(),
            target: shape.type_key().name().to_owned(),
            value: text.clone(),
            source,
        })?;

        self.validate(target, &value)?;
        trace!(key = target.key(), path = target.path(), value = %text, "property bound");
        Ok(value)
    }

    fn bind_sequence(
        &self,
        source: &dyn PropertySource,
        element: ShapeFn,
        target: &BindTarget,
    ) -> Result<Value> {
        let shape = element();
        let split = if source.has(&format!("{}[0]", target.key())) {
            None
        } else {
            match self.split_value(source, &shape, target)? {
                Some(split) => Some(split),
                None => return self.finish_container(target, Value::Array(Vec::new())),
            }
        };

        let overlay;
        let view: &dyn PropertySource = match &split {
            Some(split) => {
                overlay = Overlay::new(split, source);
                &overlay
            }
            None => source,
        };

        let mut items = Vec::new();
        for index in 0.. {
            let child = self.element_target(target, target.element(index));
            if !view.has(child.key()) {
                break;
            }
            items.push(self.bind_value(view, &shape, &child)?);
        }
        self.finish_container(target, Value::Array(items))
    }

    /// Produces `key[i]` entries from a delimited string, or `None` when the
    /// sequence is empty.
    fn split_value(
        &self,
        source: &dyn PropertySource,
        element: &Shape,
        target: &BindTarget,
    ) -> Result<Option<Properties>> {
        let key = target.key();
        let text = if source.has(key) {
            source.get(key).unwrap_or_default()
        } else {
            match target.tag().default_value() {
                None => {
                    return Err(Error::NotExist {
                        key: key.to_owned(),
                        path: target.path().to_owned(),
                    });
                }
                Some("") => return Ok(None),
                Some(default) => {
                    if !element.is_builtin_primitive()
                        && !self.converters.contains(element.type_key())
                    {
                        return Err(unsupported(
                            target,
                            "sequence can't have a non empty default value",
                        ));
                    }
                    default
                }
            }
        };
        if text.is_empty() {
            return Ok(None);
        }

        let parts = match target.tag().splitter() {
            None => text.split(',').map(|part| part.trim().to_owned()).collect(),
            Some(name) => {
                let split_error = |source: BoxError| Error::Split {
                    key: key.to_owned(),
                    path: target.path().to_owned(),
                    splitter: name.to_owned(),
                    source,
                };
                let split = self.splitters.get(name).ok_or_else(|| {
                    split_error(format!("splitter `{name}` is not registered").into())
                })?;
                split(text).map_err(split_error)?
            }
        };
        debug!(key, parts = parts.len(), "split sequence value");

        let mut properties = Properties::new();
        for (index, part) in parts.into_iter().enumerate() {
            properties
                .set(format!("{key}[{index}]"), part)
                .map_err(|err| err.at_path(target.path()))?;
        }
        Ok(Some(properties))
    }

    fn bind_mapping(
        &self,
        source: &dyn PropertySource,
        element: ShapeFn,
        target: &BindTarget,
    ) -> Result<Value> {
        if target.tag().default_value().is_some_and(|d| !d.is_empty()) {
            return Err(unsupported(target, "map can't have a non empty default value"));
        }
        let names = source
            .sub_keys(target.key())
            .map_err(|err| unsupported(target, &err.to_string()))?;

        let shape = element();
        let mut entries = Map::new();
        for name in names {
            let child = self.element_target(target, target.child(&name));
            let value = self.bind_value(source, &shape, &child)?;
            entries.insert(name, value);
        }
        self.finish_container(target, Value::Object(entries))
    }

    fn bind_composite(
        &self,
        source: &dyn PropertySource,
        fields: &[FieldSpec],
        target: &BindTarget,
    ) -> Result<Value> {
        if target.tag().default_value().is_some_and(|d| !d.is_empty()) {
            return Err(unsupported(target, "struct can't have a non empty default value"));
        }

        let mut object = Map::new();
        for field in fields {
            let path = format!("{}.{}", target.path(), field.name());
            let shape = field.shape();
            let value = match field.binding() {
                FieldBinding::Tagged(tag) => {
                    let mut child = BindTarget::new(target.key(), path.as_str());
                    child
                        .apply_tag(tag, field.rules().to_vec())
                        .map_err(|err| err.at_path(&path))?;
                    self.bind_value(source, &shape, &child)?
                }
                FieldBinding::Embedded => {
                    let child = BindTarget::new(target.key(), path.as_str());
                    let ShapeKind::Composite(inner) = shape.kind() else {
                        return Err(unsupported(
                            &child,
                            &format!(
                                "embedded field `{}` of type `{}` is not a struct",
                                field.name(),
                                shape.type_key().name()
                            ),
                        ));
                    };
                    self.bind_composite(source, inner, &child)?
                }
                FieldBinding::Nested => {
                    let child = target.child(field.name()).with_rules(field.rules().to_vec());
                    self.bind_value(source, &shape, &child)?
                }
            };
            object.insert(field.name().to_owned(), value);
        }
        Ok(Value::Object(object))
    }

    fn element_target(&self, parent: &BindTarget, child: BindTarget) -> BindTarget {
        if self.container_validation.checks_elements() {
            child.with_rules(parent.rules().to_vec())
        } else {
            child
        }
    }

    fn finish_container(&self, target: &BindTarget, value: Value) -> Result<Value> {
        if self.container_validation.checks_container() {
            self.validate(target, &value)?;
        }
        Ok(value)
    }

    fn validate(&self, target: &BindTarget, value: &Value) -> Result<()> {
        for rule in target.rules() {
            let Some(validator) = self.validators.get(&rule.name) else {
                return Err(unsupported(
                    target,
                    &format!("validator `{}` is not registered", rule.name),
                ));
            };
            let rejected = |source| validation_error(target, rule, value, source);
            match validator.validate(&rule.content, value) {
                Ok(true) => {}
                Ok(false) => return Err(rejected(None)),
                Err(err) => return Err(rejected(Some(err))),
            }
        }
        Ok(())
    }
}

fn validation_error(
    target: &BindTarget,
    rule: &Rule,
    value: &Value,
    source: Option<BoxError>,
) -> Error {
    Error::Validation {
        key: target.key().to_owned(),
        path: target.path().to_owned(),
        tag: rule.name.clone(),
        rule: rule.content.clone(),
        value: value.to_string(),
        source,
    }
}

fn unsupported(target: &BindTarget, reason: &str) -> Error {
    Error::UnsupportedShape {
        key: target.key().to_owned(),
        path: target.path().to_owned(),
        reason: reason.to_owned(),
    }
}

fn deserialize<T: DeserializeOwned>(value: &Value, target: &BindTarget) -> Result<T> {
    T::deserialize(value).map_err(|err| Error::Conversion {
        key: target.key().to_owned(),
        path: target.path().to_owned(),
        target: type_name::<T>().to_owned(),
        value: value.to_string(),
        source: Box::new(err),
    })
}

/// Overlays `bound` onto `current`; `null` leaves keep the current value.
fn merge(current: &mut Value, bound: Value) {
    match (current, bound) {
        (_, Value::Null) => {}
        (Value::Object(current), Value::Object(bound)) => {
            for (name, value) in bound {
                merge(current.entry(name).or_insert(Value::Null), value);
            }
        }
        (current, bound) => *current = bound,
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
