//! Ordered collections that are not arrays (rule 5).

use crate::error::{HessianError, Result};
use crate::types::{TypeDescriptor, builtin};
use crate::value::{Object, ObjectBody, ObjectRef, Value};

use super::{Deserializer, ObjectInput, ObjectOutput, Serializer};

/// Writes elements as a list. The generic list travels with an empty type name.
#[derive(Debug)]
pub struct SequenceSerializer {
    ty: TypeDescriptor,
}

impl SequenceSerializer {
    /// Creates a serializer for `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Serializer for SequenceSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let type_name = if self.ty.ptr_eq(&builtin::generic_list()) {
            ""
        } else {
            self.ty.name()
        };
        write_items(value, &self.ty, type_name, out)
    }
}

/// Reads list elements without an element type.
#[derive(Debug)]
pub struct SequenceDeserializer {
    ty: TypeDescriptor,
}

impl SequenceDeserializer {
    /// Creates a deserializer for `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }

    /// The decoder for untyped and unresolved lists.
    pub fn generic() -> Self {
        Self::new(builtin::generic_list())
    }
}

impl Deserializer for SequenceDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_list(&self, input: &mut dyn ObjectInput, len: Option<usize>) -> Result<Value> {
        read_items(input, &self.ty, len, None)
    }
}

/// Writes a list-bodied instance: reference check, header, elements, end.
pub(crate) fn write_items(
    value: &Value,
    ty: &TypeDescriptor,
    type_name: &str,
    out: &mut dyn ObjectOutput,
) -> Result<()> {
    let obj = value.expect_object(ty.name())?;
    if out.add_ref(obj)? {
        return Ok(());
    }
    let items = {
        let guard = obj.read();
        match guard.body() {
            ObjectBody::List(items) => items.clone(),
            other => return Err(HessianError::mismatch(ty.name(), other.kind_name())),
        }
    };
    out.write_list_begin(Some(items.len()), type_name)?;
    for item in &items {
        out.write_value(item)?;
    }
    out.write_list_end()
}

/// Registers a list of type `ty` and reads elements up to the end tag, converting each
/// to `element` when given.
pub(crate) fn read_items(
    input: &mut dyn ObjectInput,
    ty: &TypeDescriptor,
    len: Option<usize>,
    element: Option<&TypeDescriptor>,
) -> Result<Value> {
    let obj = ObjectRef::new(Object::new(ty.clone(), ObjectBody::List(Vec::new())));
    input.add_ref(obj.clone());

    // The length is a hint from the peer; cap the preallocation.
    let mut items = Vec::with_capacity(len.unwrap_or(0).min(1024));
    let mut mismatch = None;
    while !input.is_end()? {
        if mismatch.is_some() {
            input.read_value()?;
            continue;
        }
        match input.read_value_as(element) {
            Ok(item) => items.push(item),
            // Drain the rest so the caller can recover at the next value.
            Err(e @ HessianError::TypeMismatch { .. }) => mismatch = Some(e),
            Err(e) => return Err(e),
        }
    }
    input.read_end()?;
    if let Some(e) = mismatch {
        return Err(e);
    }
    if let Some(expected) = len
        && expected != items.len()
    {
        return Err(HessianError::Protocol(format!(
            "list '{}' announced {expected} elements but carried {}",
            ty.name(),
            items.len()
        )));
    }
    obj.write().set_body(ObjectBody::List(items));
    Ok(Value::Ref(obj))
}

/// Reads a list into a generic list object.
pub(crate) fn read_generic_list(input: &mut dyn ObjectInput, len: Option<usize>) -> Result<Value> {
    read_items(input, &builtin::generic_list(), len, None)
}
