//! The reflective default codec (rule 9).
//!
//! Walks the type's public instance fields (base type first, declaration order) and
//! sends each by name. The field list is computed once, when the codec is built, which
//! is why this is the codec the cache exists for.
//!
//! ## Field failures
//!
//! Problems are recovered per field, never per object:
//!
//! - encode: a declared field the instance does not carry is written as null.
//! - decode: a field the local type does not declare is read and dropped; a declared
//!   field absent from the stream, or whose value cannot be converted to the declared
//!   type, is left null.
//!
//! Each recovery records a [`Warning`] on the stream, so a partially populated object is
//! never reported as a clean result.

use crate::error::{HessianError, Result, Warning};
use crate::format::ClassDefinition;
use crate::types::{FieldInfo, TypeDescriptor};
use crate::value::{Object, ObjectBody, ObjectRef, Value};

use super::{Deserializer, ObjectInput, ObjectOutput, Serializer, begin_class};

/// Writes the serializable fields of one class.
#[derive(Debug)]
pub struct ObjectSerializer {
    ty: TypeDescriptor,
    fields: Vec<FieldInfo>,
}

impl ObjectSerializer {
    /// Creates a serializer over `ty`'s serializable fields.
    pub fn new(ty: TypeDescriptor) -> Self {
        let fields = ty.serializable_fields();
        Self::with_fields(ty, fields)
    }

    /// Creates a serializer over an explicit field list.
    pub fn with_fields(ty: TypeDescriptor, fields: Vec<FieldInfo>) -> Self {
        log::debug!(
            "[ObjectSerializer] '{}' with {} fields",
            ty.name(),
            fields.len()
        );
        Self { ty, fields }
    }

    /// Field names in wire order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

impl Serializer for ObjectSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let obj = value.expect_object(self.ty.name())?;
        if out.add_ref(obj)? {
            return Ok(());
        }
        if !begin_class(out, self.ty.name(), &self.field_names())? {
            return Ok(());
        }

        // Clone the values out so no lock is held while children are written.
        let values: Vec<Option<Value>> = {
            let guard = obj.read();
            self.fields
                .iter()
                .map(|f| guard.get(&f.name).cloned())
                .collect()
        };
        for (field, value) in self.fields.iter().zip(values) {
            match value {
                Some(value) => out.write_value(&value)?,
                None => {
                    out.warn(Warning::MissingField {
                        class: self.ty.name().to_owned(),
                        field: field.name.clone(),
                    });
                    out.write_null()?;
                }
            }
        }
        Ok(())
    }
}

/// Reads the fields of one class by name.
#[derive(Debug)]
pub struct ObjectDeserializer {
    ty: TypeDescriptor,
    fields: Vec<FieldInfo>,
}

impl ObjectDeserializer {
    /// Creates a deserializer over `ty`'s serializable fields.
    pub fn new(ty: TypeDescriptor) -> Self {
        let fields = ty.serializable_fields();
        Self::with_fields(ty, fields)
    }

    /// Creates a deserializer over an explicit field list.
    pub fn with_fields(ty: TypeDescriptor, fields: Vec<FieldInfo>) -> Self {
        log::debug!(
            "[ObjectDeserializer] '{}' with {} fields",
            ty.name(),
            fields.len()
        );
        Self { ty, fields }
    }

    fn declared(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn register(&self, input: &mut dyn ObjectInput) -> (ObjectRef, u32) {
        let obj = ObjectRef::new(Object::new(self.ty.clone(), ObjectBody::Fields(Vec::new())));
        let index = input.add_ref(obj.clone());
        (obj, index)
    }

    /// Reads one field value, recovering a conversion failure as a warning.
    fn read_field(&self, input: &mut dyn ObjectInput, name: &str) -> Result<Option<Value>> {
        let Some(field) = self.declared(name) else {
            input.read_value()?;
            input.warn(Warning::UnknownField {
                class: self.ty.name().to_owned(),
                field: name.to_owned(),
            });
            return Ok(None);
        };
        match input.read_value_as(Some(&field.ty)) {
            Ok(value) => Ok(Some(value)),
            Err(HessianError::TypeMismatch { .. }) => {
                input.warn(Warning::FieldTypeMismatch {
                    class: self.ty.name().to_owned(),
                    field: name.to_owned(),
                    expected: field.ty.name().to_owned(),
                });
                Ok(Some(Value::Null))
            }
            Err(e) => Err(e),
        }
    }

    /// Orders the received values by declaration, fills the gaps with null, publishes the
    /// body and applies the read-resolve hook.
    fn finish(
        &self,
        input: &mut dyn ObjectInput,
        obj: ObjectRef,
        index: u32,
        mut received: Vec<(String, Value)>,
    ) -> Result<Value> {
        let mut body = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match received.iter().position(|(name, _)| *name == field.name) {
                Some(at) => body.push(received.swap_remove(at)),
                None => {
                    input.warn(Warning::MissingField {
                        class: self.ty.name().to_owned(),
                        field: field.name.clone(),
                    });
                    body.push((field.name.clone(), Value::Null));
                }
            }
        }
        obj.write().set_body(ObjectBody::Fields(body));

        if let Some(hook) = self.ty.read_resolve_hook()
            && let Some(replacement) = hook(&obj)
        {
            log::trace!("[ObjectDeserializer] '{}' #{index} resolved", self.ty.name());
            input.replace_ref(index, replacement.clone())?;
            return Ok(Value::Ref(replacement));
        }
        Ok(Value::Ref(obj))
    }
}

impl Deserializer for ObjectDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        let (obj, index) = self.register(input);
        let mut received = Vec::with_capacity(def.fields.len());
        for name in &def.fields {
            if let Some(value) = self.read_field(input, name)? {
                received.push((name.clone(), value));
            }
        }
        self.finish(input, obj, index, received)
    }

    /// Field-name keyed maps decode into the object as well.
    fn read_map(&self, input: &mut dyn ObjectInput) -> Result<Value> {
        let (obj, index) = self.register(input);
        let mut received = Vec::new();
        while !input.is_end()? {
            let key = input.read_value()?;
            let Value::String(name) = key else {
                return Err(HessianError::Protocol(format!(
                    "map decoded as '{}' has a {} key",
                    self.ty.name(),
                    key.kind_name()
                )));
            };
            if let Some(value) = self.read_field(input, &name)? {
                received.push((name, value));
            }
        }
        input.read_end()?;
        self.finish(input, obj, index, received)
    }
}
