//! Arrays (rule 3). The decoder is built from the element type's own decoder, which is
//! how `"[[[int"` becomes three nested array decoders over the `int` decoder.

use std::sync::Arc;

use crate::error::{HessianError, Result};
use crate::types::{PrimitiveKind, TypeDescriptor};
use crate::value::Value;

use super::sequence::{read_items, write_items};
use super::{Deserializer, ObjectInput, ObjectOutput, Serializer};

/// Writes an array as a list typed with the array's name. A byte buffer travels as binary.
#[derive(Debug)]
pub struct ArraySerializer {
    ty: TypeDescriptor,
}

impl ArraySerializer {
    /// Creates a serializer for the array type `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Serializer for ArraySerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        if let Value::Binary(bytes) = value {
            return out.write_binary(bytes);
        }
        write_items(value, &self.ty, self.ty.name(), out)
    }
}

/// Reads list elements through the element decoder.
#[derive(Debug)]
pub struct ArrayDeserializer {
    ty: TypeDescriptor,
    element: Arc<dyn Deserializer>,
}

impl ArrayDeserializer {
    /// Creates a decoder for arrays of `element`'s type.
    pub fn new(ty: TypeDescriptor, element: Arc<dyn Deserializer>) -> Self {
        Self { ty, element }
    }

    /// Creates a decoder whose array type is derived from the element decoder.
    pub fn of(element: Arc<dyn Deserializer>) -> Self {
        Self::new(TypeDescriptor::array_of(element.own_type()), element)
    }

    /// The element decoder.
    pub fn element(&self) -> &Arc<dyn Deserializer> {
        &self.element
    }

    fn is_byte_array(&self) -> bool {
        self.element.own_type().primitive_kind() == Some(PrimitiveKind::Byte)
    }
}

impl Deserializer for ArrayDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_list(&self, input: &mut dyn ObjectInput, len: Option<usize>) -> Result<Value> {
        read_items(input, &self.ty, len, Some(self.element.own_type()))
    }

    fn from_scalar(&self, value: Value) -> Result<Value> {
        match value {
            Value::Binary(bytes) if self.is_byte_array() => Ok(Value::Binary(bytes)),
            Value::Null => Ok(Value::Null),
            other => Err(HessianError::mismatch(self.ty.name(), other.kind_name())),
        }
    }
}
