//! Map-like types (rule 1) and the generic map that unresolved class names decode into.

use crate::error::{HessianError, Result};
use crate::format::ClassDefinition;
use crate::types::{TypeDescriptor, builtin};
use crate::value::{Object, ObjectBody, ObjectRef, Value};

use super::{Deserializer, ObjectInput, ObjectOutput, Serializer};

/// Writes key/value entries. The generic map travels untyped (`H`), any other map type
/// under its name (`M`).
#[derive(Debug)]
pub struct MapSerializer {
    ty: TypeDescriptor,
}

impl MapSerializer {
    /// Creates a serializer for `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }
}

impl Serializer for MapSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        let obj = value.expect_object(self.ty.name())?;
        if out.add_ref(obj)? {
            return Ok(());
        }

        let (wire_name, entries) = {
            let guard = obj.read();
            let entries = match guard.body() {
                ObjectBody::Map(entries) => entries.clone(),
                ObjectBody::Fields(fields) => fields
                    .iter()
                    .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                    .collect(),
                other => {
                    return Err(HessianError::mismatch(self.ty.name(), other.kind_name()));
                }
            };
            (guard.wire_name().map(str::to_owned), entries)
        };

        let type_name = wire_name.as_deref().or_else(|| {
            (!self.ty.ptr_eq(&builtin::generic_map())).then(|| self.ty.name())
        });
        out.write_map_begin(type_name)?;
        for (key, value) in &entries {
            out.write_value(key)?;
            out.write_value(value)?;
        }
        out.write_map_end()
    }
}

/// Reads key/value entries into a map of its own type.
#[derive(Debug)]
pub struct MapDeserializer {
    ty: TypeDescriptor,
}

impl MapDeserializer {
    /// Creates a deserializer for `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        Self { ty }
    }

    /// The decoder for untyped maps and unresolved class names.
    pub fn generic() -> Self {
        Self::new(builtin::generic_map())
    }

    /// Reads map entries, recording `wire_name` when it differs from the local type.
    pub fn read_map_named(
        &self,
        input: &mut dyn ObjectInput,
        wire_name: Option<&str>,
    ) -> Result<Value> {
        read_entries_into(input, &self.ty, wire_name)
    }
}

impl Deserializer for MapDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn read_map(&self, input: &mut dyn ObjectInput) -> Result<Value> {
        self.read_map_named(input, None)
    }

    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        read_fields_into(input, &self.ty, def)
    }
}

/// Reads a map into a generic map object. Used to keep the stream aligned when the
/// target type cannot take a map.
pub(crate) fn read_generic_map(
    input: &mut dyn ObjectInput,
    wire_name: Option<&str>,
) -> Result<Value> {
    read_entries_into(input, &builtin::generic_map(), wire_name)
}

/// Reads a class instance into a generic map keyed by field name.
pub(crate) fn read_generic_object(
    input: &mut dyn ObjectInput,
    def: &ClassDefinition,
) -> Result<Value> {
    read_fields_into(input, &builtin::generic_map(), def)
}

fn read_entries_into(
    input: &mut dyn ObjectInput,
    ty: &TypeDescriptor,
    wire_name: Option<&str>,
) -> Result<Value> {
    let obj = register(input, ty, wire_name);
    let mut entries = Vec::new();
    while !input.is_end()? {
        let key = input.read_value()?;
        let value = input.read_value()?;
        entries.push((key, value));
    }
    input.read_end()?;
    obj.write().set_body(ObjectBody::Map(entries));
    Ok(Value::Ref(obj))
}

fn read_fields_into(
    input: &mut dyn ObjectInput,
    ty: &TypeDescriptor,
    def: &ClassDefinition,
) -> Result<Value> {
    let wire_name = (def.name != ty.name()).then_some(def.name.as_str());
    let obj = register(input, ty, wire_name);
    let mut entries = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        let value = input.read_value()?;
        entries.push((Value::String(field.clone()), value));
    }
    obj.write().set_body(ObjectBody::Map(entries));
    Ok(Value::Ref(obj))
}

fn register(input: &mut dyn ObjectInput, ty: &TypeDescriptor, wire_name: Option<&str>) -> ObjectRef {
    let mut object = Object::new(ty.clone(), ObjectBody::Map(Vec::new()));
    if let Some(name) = wire_name {
        object = object.with_wire_name(name);
    }
    let obj = ObjectRef::new(object);
    input.add_ref(obj.clone());
    obj
}
