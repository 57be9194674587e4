//! Enumerations (rule 4): a class with the single field `name`.

use crate::error::{HessianError, Result};
use crate::format::ClassDefinition;
use crate::types::TypeDescriptor;
use crate::value::{Object, ObjectBody, ObjectRef, Value};

use super::{Deserializer, ObjectInput, ObjectOutput, Serializer, begin_class, reject_layout};

const NAME_FIELD: &str = "name";

/// Writes the constant's name.
#[derive(Debug)]
pub struct EnumSerializer {
    ty: TypeDescriptor,
}

impl EnumSerializer {
    /// Creates a serializer for the enumeration `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Serializer for EnumSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let obj = value.expect_object(self.ty.name())?;
        if out.add_ref(obj)? {
            return Ok(());
        }
        let constant = match obj.read().body() {
            ObjectBody::Enum(name) => name.clone(),
            other => return Err(HessianError::mismatch(self.ty.name(), other.kind_name())),
        };
        if !begin_class(out, self.ty.name(), &[NAME_FIELD])? {
            return Ok(());
        }
        out.write_string(&constant)
    }
}

/// Reads a constant by name.
#[derive(Debug)]
pub struct EnumDeserializer {
    ty: TypeDescriptor,
}

impl EnumDeserializer {
    /// Creates a deserializer for the enumeration `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Deserializer for EnumDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        if !def.has_fields(&[NAME_FIELD]) {
            return reject_layout(input, &self.ty, def);
        }
        let obj = ObjectRef::new(Object::new(
            self.ty.clone(),
            ObjectBody::Enum(String::new()),
        ));
        input.add_ref(obj.clone());

        let constant = input.read_string()?;
        let known = self
            .ty
            .enum_constants()
            .is_some_and(|constants| constants.iter().any(|c| *c == constant));
        if !known {
            return Err(HessianError::Protocol(format!(
                "'{constant}' is not a constant of enum '{}'",
                self.ty.name()
            )));
        }
        obj.write().set_body(ObjectBody::Enum(constant));
        Ok(Value::Ref(obj))
    }
}
