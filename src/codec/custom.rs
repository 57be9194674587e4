//! Types with their own wire contract (rule 8).
//!
//! The contract turns an instance into named entries, which travel as a map typed with
//! the class name, and rebuilds the body from the entries on the other side.

use std::sync::Arc;

use crate::error::{HessianError, Result};
use crate::types::{TypeDescriptor, WireContract};
use crate::value::{Object, ObjectBody, ObjectRef, Value};

use super::{Deserializer, ObjectInput, ObjectOutput, Serializer};

/// Writes the entries produced by the contract.
#[derive(Debug)]
pub struct CustomSerializer {
    ty: TypeDescriptor,
    contract: Arc<dyn WireContract>,
}

impl CustomSerializer {
    /// Creates a serializer delegating to `contract`.
    pub fn new(ty: TypeDescriptor, contract: Arc<dyn WireContract>) -> Self {
        Self { ty, contract }
    }
}

impl Serializer for CustomSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let obj = value.expect_object(self.ty.name())?;
        if out.add_ref(obj)? {
            return Ok(());
        }
        let entries = self.contract.write_entries(&obj.read())?;
        out.write_map_begin(Some(self.ty.name()))?;
        for (name, value) in &entries {
            out.write_string(name)?;
            out.write_value(value)?;
        }
        out.write_map_end()
    }
}

/// Collects the entries and hands them to the contract.
#[derive(Debug)]
pub struct CustomDeserializer {
    ty: TypeDescriptor,
    contract: Arc<dyn WireContract>,
}

impl CustomDeserializer {
    /// Creates a deserializer delegating to `contract`.
    pub fn new(ty: TypeDescriptor, contract: Arc<dyn WireContract>) -> Self {
        Self { ty, contract }
    }
}

impl Deserializer for CustomDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_map(&self, input: &mut dyn ObjectInput) -> Result<Value> {
        let obj = ObjectRef::new(Object::new(self.ty.clone(), ObjectBody::Fields(Vec::new())));
        input.add_ref(obj.clone());

        let mut entries = Vec::new();
        while !input.is_end()? {
            let key = input.read_value()?;
            let Value::String(name) = key else {
                return Err(HessianError::Protocol(format!(
                    "entry of '{}' has a {} key",
                    self.ty.name(),
                    key.kind_name()
                )));
            };
            entries.push((name, input.read_value()?));
        }
        input.read_end()?;

        let body = self.contract.read_entries(&self.ty, entries)?;
        obj.write().set_body(body);
        Ok(Value::Ref(obj))
    }
}
