//! Byte and character streams (rule 6). The whole stream is materialized and travels as
//! one binary value; streams carry no reference index.

use crate::error::{HessianError, Result};
use crate::types::TypeDescriptor;
use crate::value::{ObjectBody, Value};

use super::{Deserializer, ObjectOutput, Serializer};

/// Writes the stream contents as binary.
#[derive(Debug)]
pub struct StreamSerializer {
    ty: TypeDescriptor,
}

impl StreamSerializer {
    /// Creates a serializer for the stream type `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Serializer for StreamSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        match value {
            Value::Binary(bytes) => out.write_binary(bytes),
            Value::Ref(obj) => {
                let bytes = match obj.read().body() {
                    ObjectBody::Bytes(bytes) => bytes.clone(),
                    other => {
                        return Err(HessianError::mismatch(self.ty.name(), other.kind_name()));
                    }
                };
                out.write_binary(&bytes)
            }
            other => Err(HessianError::mismatch(self.ty.name(), other.kind_name())),
        }
    }
}

/// Wraps received binary in a stream object.
#[derive(Debug)]
pub struct StreamDeserializer {
    ty: TypeDescriptor,
}

impl StreamDeserializer {
    /// Creates a deserializer for the stream type `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Deserializer for StreamDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn from_scalar(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Binary(bytes) => Ok(Value::stream(self.ty.clone(), bytes)),
            Value::String(text) => Ok(Value::stream(self.ty.clone(), text.into_bytes())),
            other => Err(HessianError::mismatch(self.ty.name(), other.kind_name())),
        }
    }
}
