//! The dynamic value model encoded and decoded by the codecs.
//!
//! Scalars are plain variants. Everything with identity (objects, maps, lists, arrays,
//! enums, streams) lives behind an [`ObjectRef`], a shared handle compared by pointer.
//! Two fields holding clones of the same `ObjectRef` are the same instance: that is what
//! the back-reference protocol preserves across the wire.
//!
//! Cyclic graphs are legal. They are reference-counted, so a cycle keeps itself alive
//! until one of its edges is cleared.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{HessianError, Result};
use crate::types::{PrimitiveKind, TypeDescriptor, builtin};

/// A dynamically typed value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An unsigned byte. Travels as an int.
    Byte(u8),
    /// A signed byte. Travels as an int.
    SByte(i8),
    /// A character. Travels as a one-character string.
    Char(char),
    /// A 16-bit integer. Travels as an int.
    Short(i16),
    /// A 32-bit integer.
    Int(i32),
    /// A 64-bit integer.
    Long(i64),
    /// A single-precision float. Travels as a double.
    Float(f32),
    /// A double-precision float.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    /// A raw byte buffer (the `[byte` type).
    Binary(Vec<u8>),
    /// A shared instance.
    Ref(ObjectRef),
}

impl Value {
    /// The type that selects this value's serializer.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        let kind = match self {
            Self::Null => return builtin::generic_map(),
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Byte(_) => PrimitiveKind::Byte,
            Self::SByte(_) => PrimitiveKind::SByte,
            Self::Char(_) => PrimitiveKind::Char,
            Self::Short(_) => PrimitiveKind::Short,
            Self::Int(_) => PrimitiveKind::Int,
            Self::Long(_) => PrimitiveKind::Long,
            Self::Float(_) => PrimitiveKind::Float,
            Self::Double(_) => PrimitiveKind::Double,
            Self::String(_) => PrimitiveKind::String,
            Self::Date(_) => PrimitiveKind::Date,
            Self::Binary(_) => {
                return builtin::primitive_array(PrimitiveKind::Byte)
                    .unwrap_or_else(builtin::generic_list);
            }
            Self::Ref(obj) => return obj.type_descriptor(),
        };
        builtin::primitive(kind)
    }

    /// Short label used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Ref(obj) => obj.type_descriptor().name().to_owned(),
            other => other.type_descriptor().name().to_owned(),
        }
    }

    /// Builds a fields object of type `ty`.
    pub fn object<I, S>(ty: TypeDescriptor, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::Ref(ObjectRef::new(Object::new(ty, ObjectBody::Fields(fields))))
    }

    /// Builds a list (sequence or array) of type `ty`.
    pub fn list(ty: TypeDescriptor, items: Vec<Value>) -> Self {
        Self::Ref(ObjectRef::new(Object::new(ty, ObjectBody::List(items))))
    }

    /// Builds a map of type `ty`.
    pub fn map(ty: TypeDescriptor, entries: Vec<(Value, Value)>) -> Self {
        Self::Ref(ObjectRef::new(Object::new(ty, ObjectBody::Map(entries))))
    }

    /// Builds an untyped map.
    pub fn generic_map(entries: Vec<(Value, Value)>) -> Self {
        Self::map(builtin::generic_map(), entries)
    }

    /// Builds an untyped list.
    pub fn generic_list(items: Vec<Value>) -> Self {
        Self::list(builtin::generic_list(), items)
    }

    /// Builds an enum constant of type `ty`.
    pub fn enumeration(ty: TypeDescriptor, constant: impl Into<String>) -> Self {
        Self::Ref(ObjectRef::new(Object::new(
            ty,
            ObjectBody::Enum(constant.into()),
        )))
    }

    /// Builds a stream object of type `ty` holding `bytes`.
    pub fn stream(ty: TypeDescriptor, bytes: Vec<u8>) -> Self {
        Self::Ref(ObjectRef::new(Object::new(ty, ObjectBody::Bytes(bytes))))
    }

    /// Builds a platform decimal from its canonical text.
    pub fn decimal(text: impl Into<String>) -> Self {
        Self::object(builtin::decimal(), [("value", Self::String(text.into()))])
    }

    /// Builds a platform guid from its canonical text.
    pub fn guid(text: impl Into<String>) -> Self {
        Self::object(builtin::guid(), [("value", Self::String(text.into()))])
    }

    /// Builds a platform locale from its tag.
    pub fn locale(tag: impl Into<String>) -> Self {
        Self::object(builtin::locale(), [("value", Self::String(tag.into()))])
    }

    /// The platform null-marker.
    pub fn dbnull() -> Self {
        Self::object(builtin::dbnull(), Vec::<(String, Value)>::new())
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The shared handle, if this is a reference value.
    pub fn as_ref_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Ref(obj) => Some(obj),
            _ => None,
        }
    }

    /// The shared handle or a type error.
    pub fn expect_object(&self, expected: &str) -> Result<&ObjectRef> {
        self.as_ref_object()
            .ok_or_else(|| HessianError::mismatch(expected, self.kind_name()))
    }

    /// String contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widening integer view over every integral variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::SByte(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            Self::Char(c) => Some(i64::from(u32::from(*c))),
            _ => None,
        }
    }

    /// Floating view over every numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Boolean contents.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Identity comparison for references, equality for scalars.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
            (Self::Ref(_), _) | (_, Self::Ref(_)) => false,
            (a, b) => scalar_eq(a, b),
        }
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Binary(x), Value::Binary(y)) => x == y,
        (Value::Float(_) | Value::Double(_), _) | (_, Value::Float(_) | Value::Double(_)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Ref(v)
    }
}

/// The contents of a shared instance.
#[derive(Debug, Clone)]
pub enum ObjectBody {
    /// Named fields in schema order (reflective, error, custom and leaf objects).
    Fields(Vec<(String, Value)>),
    /// Key/value entries in insertion order.
    Map(Vec<(Value, Value)>),
    /// Elements of a sequence or array.
    List(Vec<Value>),
    /// An enum constant name.
    Enum(String),
    /// Materialized stream contents.
    Bytes(Vec<u8>),
}

impl ObjectBody {
    /// Short label used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Fields(_) => "fields",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Enum(_) => "enum",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// A typed instance.
#[derive(Clone)]
pub struct Object {
    ty: TypeDescriptor,
    wire_name: Option<String>,
    body: ObjectBody,
}

impl Object {
    /// Creates an instance.
    pub fn new(ty: TypeDescriptor, body: ObjectBody) -> Self {
        Self {
            ty,
            wire_name: None,
            body,
        }
    }

    /// Records the wire name the instance was received under, when it differs from the
    /// local type (unresolved types decode as generic maps).
    #[must_use]
    pub fn with_wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// The instance's type.
    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// The received wire name, if it differs from the type name.
    pub fn wire_name(&self) -> Option<&str> {
        self.wire_name.as_deref()
    }

    /// The body.
    pub fn body(&self) -> &ObjectBody {
        &self.body
    }

    /// Mutable body.
    pub fn body_mut(&mut self) -> &mut ObjectBody {
        &mut self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: ObjectBody) {
        self.body = body;
    }

    /// Named field lookup. Works on field bodies and on maps with string keys.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match &self.body {
            ObjectBody::Fields(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            ObjectBody::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(name))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Sets a named field, appending it if absent. Map bodies get a string key.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match &mut self.body {
            ObjectBody::Fields(fields) => {
                match fields.iter_mut().find(|(k, _)| k == name) {
                    Some(slot) => slot.1 = value,
                    None => fields.push((name.to_owned(), value)),
                }
                Ok(())
            }
            ObjectBody::Map(entries) => {
                match entries.iter_mut().find(|(k, _)| k.as_str() == Some(name)) {
                    Some(slot) => slot.1 = value,
                    None => entries.push((Value::String(name.to_owned()), value)),
                }
                Ok(())
            }
            other => Err(HessianError::mismatch(
                "fields or map",
                other.kind_name().to_owned(),
            )),
        }
    }

    /// Elements of a list body.
    pub fn items(&self) -> Option<&[Value]> {
        match &self.body {
            ObjectBody::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map body.
    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        match &self.body {
            ObjectBody::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Children are ObjectRefs whose Debug is shallow, so this never recurses into
        // a cycle.
        f.debug_struct("Object")
            .field("ty", &self.ty.name())
            .field("wire_name", &self.wire_name)
            .field("body", &self.body)
            .finish()
    }
}

/// Shared handle to an [`Object`]. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Wraps a new instance.
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Shared access.
    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read()
    }

    /// Exclusive access.
    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write()
    }

    /// The instance's type.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        self.0.read().ty.clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address used as the identity key of the encode-side reference table.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Shorthand for `read().get(name).cloned()`.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.0.read().get(name).cloned()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(obj) => write!(f, "ObjectRef({} @{:#x})", obj.ty.name(), self.addr()),
            None => write!(f, "ObjectRef(<locked> @{:#x})", self.addr()),
        }
    }
}
