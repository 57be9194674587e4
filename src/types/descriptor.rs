use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::value::{Object, ObjectBody, ObjectRef};

use super::builtin;

/// Scalar kinds known to the primitive codec table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Byte,
    SByte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
}

impl PrimitiveKind {
    /// All kinds, in table registration order.
    pub const ALL: [PrimitiveKind; 11] = [
        Self::Char,
        Self::Byte,
        Self::SByte,
        Self::Short,
        Self::Int,
        Self::Double,
        Self::String,
        Self::Long,
        Self::Float,
        Self::Bool,
        Self::Date,
    ];

    /// The wire type name of the scalar.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::SByte => "sbyte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Date => "date",
        }
    }

    /// Whether the kind has a built-in array form (`"[" + wire_name`).
    pub fn has_array_form(&self) -> bool {
        !matches!(self, Self::Date)
    }
}

/// Capability bits used by the fallback resolver.
///
/// Layout: one bit per structural capability, mirroring a flags byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Supports key/value iteration.
    pub const MAP: Self = Self(0b0000_0001);
    /// Supports ordered iteration.
    pub const SEQUENCE: Self = Self(0b0000_0010);
    /// Is a byte or character stream.
    pub const STREAM: Self = Self(0b0000_0100);
    /// Is an error/exception type.
    pub const ERROR: Self = Self(0b0000_1000);
    /// Implements its own wire contract.
    pub const CUSTOM: Self = Self(0b0001_0000);
    /// Replaces itself after construction.
    pub const READ_RESOLVE: Self = Self(0b0010_0000);
    /// Is a protocol-visible remote handle.
    pub const REMOTE_HANDLE: Self = Self(0b0100_0000);

    /// No capabilities.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of both sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns the raw bits.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Capabilities, &str); 7] = [
            (Capabilities::MAP, "MAP"),
            (Capabilities::SEQUENCE, "SEQUENCE"),
            (Capabilities::STREAM, "STREAM"),
            (Capabilities::ERROR, "ERROR"),
            (Capabilities::CUSTOM, "CUSTOM"),
            (Capabilities::READ_RESOLVE, "READ_RESOLVE"),
            (Capabilities::REMOTE_HANDLE, "REMOTE_HANDLE"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Capabilities({})", set.join(" | "))
    }
}

/// The structural shape of a type.
#[derive(Debug, Clone)]
pub enum TypeShape {
    /// Built-in scalar.
    Primitive(PrimitiveKind),
    /// Array of the element type.
    Array(TypeDescriptor),
    /// Nullable wrapper around the inner type.
    Nullable(TypeDescriptor),
    /// Enumeration with its constants in ordinal order.
    Enum(Vec<String>),
    /// Any other class or struct.
    Class,
}

/// Field visibility as seen by the reflective codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A declared field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name as written on the wire.
    pub name: String,
    /// Declared type.
    pub ty: TypeDescriptor,
    /// Visibility.
    pub visibility: Visibility,
    /// Static fields belong to the type, not the instance.
    pub is_static: bool,
}

impl FieldInfo {
    /// A public instance field.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            is_static: false,
        }
    }

    /// Marks the field private.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Marks the field static.
    #[must_use]
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Whether the reflective codec serializes this field.
    pub fn is_serializable(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }
}

/// A type that implements its own wire contract (the custom-serializable capability).
///
/// The contract flattens an instance into named entries and rebuilds a body from them.
pub trait WireContract: Send + Sync + fmt::Debug {
    /// Produces the entries to transmit for `object`.
    fn write_entries(&self, object: &Object) -> Result<Vec<(String, crate::Value)>>;

    /// Rebuilds an object body from the received entries.
    fn read_entries(&self, ty: &TypeDescriptor, entries: Vec<(String, crate::Value)>)
    -> Result<ObjectBody>;
}

/// Post-construction identity replacement.
pub type ReadResolveFn = Arc<dyn Fn(&ObjectRef) -> Option<ObjectRef> + Send + Sync>;

/// Runtime information about one type.
pub struct TypeInfo {
    name: String,
    shape: TypeShape,
    capabilities: Capabilities,
    base: Option<TypeDescriptor>,
    fields: Vec<FieldInfo>,
    contract: Option<Arc<dyn WireContract>>,
    read_resolve: Option<ReadResolveFn>,
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("capabilities", &self.capabilities)
            .field("base", &self.base.as_ref().map(TypeDescriptor::name))
            .field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
            .finish()
    }
}

impl TypeInfo {
    /// Starts a class type.
    pub fn class(name: impl Into<String>) -> TypeInfoBuilder {
        TypeInfoBuilder::new(name.into(), TypeShape::Class)
    }

    /// Starts a type with an explicit shape.
    pub fn with_shape(name: impl Into<String>, shape: TypeShape) -> TypeInfoBuilder {
        TypeInfoBuilder::new(name.into(), shape)
    }
}

/// Fluent builder for [`TypeInfo`].
#[derive(Debug)]
pub struct TypeInfoBuilder {
    info: TypeInfo,
}

impl TypeInfoBuilder {
    fn new(name: String, shape: TypeShape) -> Self {
        Self {
            info: TypeInfo {
                name,
                shape,
                capabilities: Capabilities::empty(),
                base: None,
                fields: Vec::new(),
                contract: None,
                read_resolve: None,
            },
        }
    }

    /// Adds a public instance field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.info.fields.push(FieldInfo::new(name, ty));
        self
    }

    /// Adds a field with explicit visibility flags.
    #[must_use]
    pub fn field_info(mut self, field: FieldInfo) -> Self {
        self.info.fields.push(field);
        self
    }

    /// Sets the base type.
    #[must_use]
    pub fn base(mut self, base: TypeDescriptor) -> Self {
        self.info.base = Some(base);
        self
    }

    /// Adds capability bits.
    #[must_use]
    pub fn capability(mut self, caps: Capabilities) -> Self {
        self.info.capabilities = self.info.capabilities.with(caps);
        self
    }

    /// Attaches a custom wire contract (sets [`Capabilities::CUSTOM`]).
    #[must_use]
    pub fn contract(mut self, contract: Arc<dyn WireContract>) -> Self {
        self.info.contract = Some(contract);
        self.capability(Capabilities::CUSTOM)
    }

    /// Attaches a read-resolve hook (sets [`Capabilities::READ_RESOLVE`]).
    #[must_use]
    pub fn read_resolve(mut self, hook: ReadResolveFn) -> Self {
        self.info.read_resolve = Some(hook);
        self.capability(Capabilities::READ_RESOLVE)
    }

    /// Freezes the type into a descriptor.
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor(Arc::new(self.info))
    }
}

/// Identity handle for a runtime type.
///
/// Equality and hashing use the identity of the underlying allocation, not the name.
#[derive(Clone)]
pub struct TypeDescriptor(Arc<TypeInfo>);

impl TypeDescriptor {
    /// An enumeration type with constants in ordinal order.
    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeInfo::with_shape(
            name,
            TypeShape::Enum(constants.into_iter().map(Into::into).collect()),
        )
        .build()
    }

    /// The array type of `element`.
    ///
    /// Scalar elements return the interned built-in array descriptor.
    pub fn array_of(element: &TypeDescriptor) -> Self {
        if let Some(kind) = element.primitive_kind()
            && let Some(interned) = builtin::primitive_array(kind)
            && builtin::primitive(kind).ptr_eq(element)
        {
            return interned;
        }
        TypeInfo::with_shape(
            format!("[{}", element.name()),
            TypeShape::Array(element.clone()),
        )
        .build()
    }

    /// The nullable wrapper of `inner`.
    pub fn nullable(inner: &TypeDescriptor) -> Self {
        TypeInfo::with_shape(format!("{}?", inner.name()), TypeShape::Nullable(inner.clone()))
            .build()
    }

    /// The interned descriptor of a scalar kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        builtin::primitive(kind)
    }

    /// Full type name. This is also the codec cache key.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Structural shape.
    pub fn shape(&self) -> &TypeShape {
        &self.0.shape
    }

    /// Capability bits.
    pub fn capabilities(&self) -> Capabilities {
        self.0.capabilities
    }

    /// Base type, if any.
    pub fn base(&self) -> Option<&TypeDescriptor> {
        self.0.base.as_ref()
    }

    /// Fields declared directly on this type.
    pub fn declared_fields(&self) -> &[FieldInfo] {
        &self.0.fields
    }

    /// Custom wire contract, if any.
    pub fn contract(&self) -> Option<&Arc<dyn WireContract>> {
        self.0.contract.as_ref()
    }

    /// Read-resolve hook, if any.
    pub fn read_resolve_hook(&self) -> Option<&ReadResolveFn> {
        self.0.read_resolve.as_ref()
    }

    /// Scalar kind for primitive types.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.shape() {
            TypeShape::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Element type for array types.
    pub fn element_type(&self) -> Option<&TypeDescriptor> {
        match self.shape() {
            TypeShape::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Enum constants for enumeration types.
    pub fn enum_constants(&self) -> Option<&[String]> {
        match self.shape() {
            TypeShape::Enum(constants) => Some(constants),
            _ => None,
        }
    }

    /// Public instance fields in serialization order: base type fields first, then
    /// declared fields, each in declaration order. A field redeclared by a subtype
    /// keeps the base position.
    pub fn serializable_fields(&self) -> Vec<FieldInfo> {
        let mut chain = vec![self];
        let mut cursor = self.base();
        while let Some(base) = cursor {
            chain.push(base);
            cursor = base.base();
        }

        let mut fields: Vec<FieldInfo> = Vec::new();
        for ty in chain.into_iter().rev() {
            for field in ty.declared_fields().iter().filter(|f| f.is_serializable()) {
                match fields.iter_mut().find(|f| f.name == field.name) {
                    Some(slot) => *slot = field.clone(),
                    None => fields.push(field.clone()),
                }
            }
        }
        fields
    }

    /// True when a value of `other` can be used where `self` is expected.
    pub fn is_assignable_from(&self, other: &TypeDescriptor) -> bool {
        let mut cursor = Some(other);
        while let Some(ty) = cursor {
            if ty.ptr_eq(self) || ty.name() == self.name() {
                return true;
            }
            cursor = ty.base();
        }
        false
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &TypeDescriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.name())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_not_name_equality() {
        let a = TypeInfo::class("com.acme.Point").build();
        let b = TypeInfo::class("com.acme.Point").build();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.is_assignable_from(&b));
    }

    #[test]
    fn base_fields_come_first() {
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        let base = TypeInfo::class("Shape")
            .field("id", int.clone())
            .field_info(FieldInfo::new("cache", int.clone()).private())
            .build();
        let circle = TypeInfo::class("Circle")
            .base(base.clone())
            .field("radius", int.clone())
            .field_info(FieldInfo::new("COUNT", int.clone()).static_field())
            .field("id", int)
            .build();

        let names: Vec<String> = circle
            .serializable_fields()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["id", "radius"]);
        assert!(base.is_assignable_from(&circle));
        assert!(!circle.is_assignable_from(&base));
    }

    #[test]
    fn scalar_arrays_are_interned() {
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        assert!(TypeDescriptor::array_of(&int).ptr_eq(&TypeDescriptor::array_of(&int)));

        let point = TypeInfo::class("Point").build();
        let points = TypeDescriptor::array_of(&point);
        assert_eq!(points.name(), "[Point");
        assert!(points.element_type().is_some_and(|e| e.ptr_eq(&point)));
    }

    #[test]
    fn capability_bits() {
        let caps = Capabilities::MAP.with(Capabilities::SEQUENCE);
        assert!(caps.contains(Capabilities::MAP));
        assert!(caps.contains(Capabilities::SEQUENCE));
        assert!(!caps.contains(Capabilities::ERROR));
        assert_eq!(format!("{caps:?}"), "Capabilities(MAP | SEQUENCE)");
    }
}
