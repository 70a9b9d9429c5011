//! Shape descriptors driving the binder's dispatch.

use std::any::{TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use bindery_core::Rule;

/// Identity of a bound Rust type, used to look up converters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Returns the key of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }
}

/// Built-in scalar parsing rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    /// Signed integer of the given bit width.
    Int {
        /// Bit width used for range checks.
        bits: u32,
    },
    /// Unsigned integer of the given bit width.
    Uint {
        /// Bit width used for range checks.
        bits: u32,
    },
    /// Floating point number of the given bit width.
    Float {
        /// Bit width used for range checks.
        bits: u32,
    },
    /// Boolean.
    Bool,
    /// UTF-8 string, taken verbatim.
    String,
}

/// Lazily produced shape, so recursive types do not unfold eagerly.
pub type ShapeFn = fn() -> Shape;

/// Closed set of shapes the binder knows how to fill.
#[derive(Clone, Debug)]
pub enum ShapeKind {
    /// A scalar. `None` marks a type that only a registered converter can produce.
    Primitive(Option<Primitive>),
    /// Ordered elements bound from `key[i]` entries or a delimited string.
    Sequence(ShapeFn),
    /// String-keyed entries bound from the sub-keys of a prefix.
    Mapping(ShapeFn),
    /// A value that is `null` when the inner binding reports a missing property.
    Optional(ShapeFn),
    /// A struct with declared fields.
    Composite(Vec<FieldSpec>),
}

/// Target shape descriptor: the type identity plus its kind.
#[derive(Clone, Debug)]
pub struct Shape {
    ty: TypeKey,
    kind: ShapeKind,
}

impl Shape {
    /// Scalar parsed with a built-in rule.
    #[must_use]
    pub fn primitive<T: ?Sized + 'static>(primitive: Primitive) -> Self {
        Self::new::<T>(ShapeKind::Primitive(Some(primitive)))
    }

    /// Scalar produced only by a registered converter.
    #[must_use]
    pub fn custom<T: ?Sized + 'static>() -> Self {
        Self::new::<T>(ShapeKind::Primitive(None))
    }

    /// Sequence of `element` shapes.
    #[must_use]
    pub fn sequence<T: ?Sized + 'static>(element: ShapeFn) -> Self {
        Self::new::<T>(ShapeKind::Sequence(element))
    }

    /// Mapping from sub-key names to `element` shapes.
    #[must_use]
    pub fn mapping<T: ?Sized + 'static>(element: ShapeFn) -> Self {
        Self::new::<T>(ShapeKind::Mapping(element))
    }

    /// Optional `inner` shape.
    #[must_use]
    pub fn optional<T: ?Sized + 'static>(inner: ShapeFn) -> Self {
        Self::new::<T>(ShapeKind::Optional(inner))
    }

    /// Struct with the given fields, in declaration order.
    #[must_use]
    pub fn composite<T: ?Sized + 'static>(fields: Vec<FieldSpec>) -> Self {
        Self::new::<T>(ShapeKind::Composite(fields))
    }

    fn new<T: ?Sized + 'static>(kind: ShapeKind) -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            kind,
        }
    }

    /// Identity of the described type.
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    /// Kind of the described type.
    #[must_use]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Returns `true` for scalars with a built-in parsing rule.
    #[must_use]
    pub fn is_builtin_primitive(&self) -> bool {
        matches!(self.kind, ShapeKind::Primitive(Some(_)))
    }
}

/// How a struct field finds its properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldBinding {
    /// Bound from its own `${...}` value tag, relative to the parent key.
    Tagged(String),
    /// Flattened: an embedded struct sharing the parent's key and path.
    Embedded,
    /// Bound at `parent.field_name`.
    Nested,
}

/// Declared field of a composite shape.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    name: String,
    binding: FieldBinding,
    shape: ShapeFn,
    rules: Vec<Rule>,
}

impl FieldSpec {
    /// Field bound from a value tag such as `${port:=8080}`.
    #[must_use]
    pub fn tagged(name: impl Into<String>, tag: impl Into<String>, shape: ShapeFn) -> Self {
        Self::new(name, FieldBinding::Tagged(tag.into()), shape)
    }

    /// Embedded struct flattened into its parent.
    #[must_use]
    pub fn embedded(name: impl Into<String>, shape: ShapeFn) -> Self {
        Self::new(name, FieldBinding::Embedded, shape)
    }

    /// Untagged field bound under its own name.
    #[must_use]
    pub fn nested(name: impl Into<String>, shape: ShapeFn) -> Self {
        Self::new(name, FieldBinding::Nested, shape)
    }

    fn new(name: impl Into<String>, binding: FieldBinding, shape: ShapeFn) -> Self {
        Self {
            name: name.into(),
            binding,
            shape,
            rules: Vec::new(),
        }
    }

    /// Adds a validation rule handled by the validator registered as `name`.
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.rules.push(Rule::new(name, content));
        self
    }

    /// Field name, also the key in the bound object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binding strategy of the field.
    #[must_use]
    pub fn binding(&self) -> &FieldBinding {
        &self.binding
    }

    /// Shape of the field type.
    #[must_use]
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }

    /// Validation rules, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// Types that can describe their own binding shape.
///
/// Implemented for scalars, `String`, `PathBuf`, `Duration`, `Vec`,
/// string-keyed maps, `Option` and `Box`. Structs use
/// `#[derive(Describe)]`.
pub trait Describe {
    /// Returns the shape of `Self`.
    fn shape() -> Shape;
}

macro_rules! describe_primitive {
    ($($ty:ty => $primitive:expr),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn shape() -> Shape {
                    Shape::primitive::<$ty>($primitive)
                }
            }
        )*
    };
}

describe_primitive! {
    i8 => Primitive::Int { bits: 8 },
    i16 => Primitive::Int { bits: 16 },
    i32 => Primitive::Int { bits: 32 },
    i64 => Primitive::Int { bits: 64 },
    isize => Primitive::Int { bits: isize::BITS },
    u8 => Primitive::Uint { bits: 8 },
    u16 => Primitive::Uint { bits: 16 },
    u32 => Primitive::Uint { bits: 32 },
    u64 => Primitive::Uint { bits: 64 },
    usize => Primitive::Uint { bits: usize::BITS },
    f32 => Primitive::Float { bits: 32 },
    f64 => Primitive::Float { bits: 64 },
    bool => Primitive::Bool,
    String => Primitive::String,
    PathBuf => Primitive::String,
}

impl Describe for Duration {
    fn shape() -> Shape {
        Shape::custom::<Duration>()
    }
}

impl<T: Describe + 'static> Describe for Vec<T> {
    fn shape() -> Shape {
        Shape::sequence::<Self>(T::shape)
    }
}

impl<K: 'static, V: Describe + 'static, S: 'static> Describe for HashMap<K, V, S> {
    fn shape() -> Shape {
        Shape::mapping::<Self>(V::shape)
    }
}

impl<K: 'static, V: Describe + 'static> Describe for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::mapping::<Self>(V::shape)
    }
}

impl<T: Describe + 'static> Describe for Option<T> {
    fn shape() -> Shape {
        Shape::optional::<Self>(T::shape)
    }
}

impl<T: Describe> Describe for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_describe_their_elements() {
        let shape = <Vec<Option<u16>>>::shape();
        let ShapeKind::Sequence(element) = shape.kind() else {
            panic!("expected a sequence");
        };
        let element = element();
        assert!(matches!(element.kind(), ShapeKind::Optional(_)));

        let shape = <BTreeMap<String, f32>>::shape();
        assert!(matches!(shape.kind(), ShapeKind::Mapping(_)));
        assert_eq!(shape.type_key(), TypeKey::of::<BTreeMap<String, f32>>());
    }

    #[test]
    fn boxed_types_share_the_inner_key() {
        assert_eq!(<Box<Duration>>::shape().type_key(), TypeKey::of::<Duration>());
        assert!(!Duration::shape().is_builtin_primitive());
        assert!(u8::shape().is_builtin_primitive());
    }

    #[test]
    fn field_specs_collect_rules_in_order() {
        let field = FieldSpec::tagged("port", "${port:=8080}", u16::shape)
            .rule("expr", "$ > 0")
            .rule("expr", "$ < 65536");
        assert_eq!(field.name(), "port");
        assert_eq!(field.binding(), &FieldBinding::Tagged("${port:=8080}".into()));
        assert_eq!(field.rules()[1].content, "$ < 65536");
    }
}
