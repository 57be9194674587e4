//! Leaf codecs for the platform value types registered in the primitive table.
//!
//! Decimal, guid and locale travel as a class with one string field, `value`, holding
//! the canonical text. The null marker is a class with no fields.

use crate::error::{HessianError, Result};
use crate::format::ClassDefinition;
use crate::types::TypeDescriptor;
use crate::value::{Object, ObjectBody, ObjectRef, Value};

use super::{Deserializer, ObjectInput, ObjectOutput, Serializer, begin_class, reject_layout};

const VALUE_FIELD: &str = "value";

/// Writes a single-`value` object under a fixed wire name.
#[derive(Debug)]
pub struct ValueObjectSerializer {
    wire_name: String,
}

impl ValueObjectSerializer {
    /// Creates a serializer writing class `wire_name`.
    pub fn new(wire_name: impl Into<String>) -> Self {
        Self {
            wire_name: wire_name.into(),
        }
    }
}

impl Serializer for ValueObjectSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let obj = value.expect_object(&self.wire_name)?;
        if out.add_ref(obj)? {
            return Ok(());
        }
        let text = match obj.field(VALUE_FIELD) {
            Some(Value::String(text)) => text,
            Some(other) => return Err(HessianError::mismatch("string", other.kind_name())),
            None => {
                return Err(HessianError::mismatch(
                    format!("{} with a value", self.wire_name),
                    "no value",
                ));
            }
        };
        if !begin_class(out, &self.wire_name, &[VALUE_FIELD])? {
            return Ok(());
        }
        out.write_string(&text)
    }
}

/// Reads a single-`value` object.
#[derive(Debug)]
pub struct ValueObjectDeserializer {
    ty: TypeDescriptor,
}

impl ValueObjectDeserializer {
    /// Creates a deserializer producing `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Deserializer for ValueObjectDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        if !def.has_fields(&[VALUE_FIELD]) {
            return reject_layout(input, &self.ty, def);
        }
        let obj = ObjectRef::new(Object::new(self.ty.clone(), ObjectBody::Fields(Vec::new())));
        input.add_ref(obj.clone());
        let text = input.read_string()?;
        obj.write()
            .set_body(ObjectBody::Fields(vec![(VALUE_FIELD.to_owned(), Value::String(text))]));
        Ok(Value::Ref(obj))
    }

    fn from_scalar(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(text) => Ok(Value::object(
                self.ty.clone(),
                [(VALUE_FIELD, Value::String(text))],
            )),
            other => Err(HessianError::mismatch(self.ty.name(), other.kind_name())),
        }
    }
}

/// Writes a field-less marker object.
#[derive(Debug)]
pub struct MarkerSerializer {
    wire_name: String,
}

impl MarkerSerializer {
    /// Creates a serializer writing class `wire_name`.
    pub fn new(wire_name: impl Into<String>) -> Self {
        Self {
            wire_name: wire_name.into(),
        }
    }
}

impl Serializer for MarkerSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let obj = value.expect_object(&self.wire_name)?;
        if out.add_ref(obj)? {
            return Ok(());
        }
        begin_class(out, &self.wire_name, &[]).map(|_| ())
    }
}

/// Reads a field-less marker object.
#[derive(Debug)]
pub struct MarkerDeserializer {
    ty: TypeDescriptor,
}

impl MarkerDeserializer {
    /// Creates a deserializer producing `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Deserializer for MarkerDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        if !def.has_fields(&[]) {
            return reject_layout(input, &self.ty, def);
        }
        let obj = ObjectRef::new(Object::new(self.ty.clone(), ObjectBody::Fields(Vec::new())));
        input.add_ref(obj.clone());
        Ok(Value::Ref(obj))
    }
}
