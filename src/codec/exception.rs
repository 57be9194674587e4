//! Error types (rule 7): the reflective layout with `message` and `stackTrace` first.

use crate::error::Result;
use crate::format::ClassDefinition;
use crate::types::{FieldInfo, PrimitiveKind, TypeDescriptor};
use crate::value::Value;

use super::object::{ObjectDeserializer, ObjectSerializer};
use super::{Deserializer, ObjectInput, ObjectOutput, Serializer};

/// Field carrying the error's description.
pub const MESSAGE_FIELD: &str = "message";
/// Field carrying the error's origin trace.
pub const STACK_TRACE_FIELD: &str = "stackTrace";

/// `message`, `stackTrace`, then the type's own serializable fields.
pub fn error_fields(ty: &TypeDescriptor) -> Vec<FieldInfo> {
    let string = TypeDescriptor::primitive(PrimitiveKind::String);
    let mut fields = vec![
        FieldInfo::new(MESSAGE_FIELD, string.clone()),
        FieldInfo::new(STACK_TRACE_FIELD, string),
    ];
    fields.extend(
        ty.serializable_fields()
            .into_iter()
            .filter(|f| f.name != MESSAGE_FIELD && f.name != STACK_TRACE_FIELD),
    );
    fields
}

/// Writes an error value.
#[derive(Debug)]
pub struct ErrorSerializer {
    inner: ObjectSerializer,
}

impl ErrorSerializer {
    /// Creates a serializer for the error type `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        let fields = error_fields(&ty);
        Self {
            inner: ObjectSerializer::with_fields(ty, fields),
        }
    }
}

impl Serializer for ErrorSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        self.inner.write_object(value, out)
    }
}

/// Reads an error value.
#[derive(Debug)]
pub struct ErrorDeserializer {
    inner: ObjectDeserializer,
}

impl ErrorDeserializer {
    /// Creates a deserializer for the error type `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        let fields = error_fields(&ty);
        Self {
            inner: ObjectDeserializer::with_fields(ty, fields),
        }
    }
}

impl Deserializer for ErrorDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        self.inner.own_type()
    }

    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        self.inner.read_object(input, def)
    }

    fn read_map(&self, input: &mut dyn ObjectInput) -> Result<Value> {
        self.inner.read_map(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capabilities, TypeInfo};

    #[test]
    fn message_and_trace_lead() {
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        let string = TypeDescriptor::primitive(PrimitiveKind::String);
        let ty = TypeInfo::class("app.QuotaExceeded")
            .capability(Capabilities::ERROR)
            .field("limit", int)
            .field("message", string)
            .build();
        let names: Vec<String> = error_fields(&ty).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["message", "stackTrace", "limit"]);
    }
}
