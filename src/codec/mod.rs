//! Codec traits and the closed set of built-in codecs.
//!
//! A codec is selected once per type (by the primitive table or the capability resolver)
//! and shared as an `Arc<dyn Serializer>` / `Arc<dyn Deserializer>`. Codecs never touch
//! bytes directly: they talk to the stream through [`ObjectOutput`] and [`ObjectInput`],
//! which own the reference and class-definition tables of one encode or decode call.
//!
//! ## Object protocol (encode)
//!
//! Every codec for an instance with identity follows the same sequence:
//!
//! 1. [`ObjectOutput::add_ref`]: if it returns `true` the stream already wrote a
//!    back-reference and the codec is done.
//! 2. For class-shaped values, [`ObjectOutput::write_object_begin`]:
//!    - [`ClassState::NewClass`]: write the field count and names, call
//!      `write_object_begin` again, then the values.
//!    - [`ClassState::Known`]: write the values.
//!    - [`ClassState::AlreadyWritten`]: write nothing.
//!
//! ## Object protocol (decode)
//!
//! Decoders register their instance with [`ObjectInput::add_ref`] before reading any
//! child value, so a child that points back at its parent resolves to the same instance.

use std::fmt;

use crate::error::{HessianError, Result, Warning};
use crate::format::{ClassDefinition, ClassState};
use crate::types::{Capabilities, TypeDescriptor};
use crate::value::{ObjectRef, Value};

pub mod array;
pub mod basic;
pub mod custom;
pub mod enumeration;
pub mod exception;
pub mod leaf;
pub mod map;
pub mod object;
pub mod sequence;
pub mod stream;

pub use array::{ArrayDeserializer, ArraySerializer};
pub use basic::{BasicDeserializer, BasicSerializer};
pub use custom::{CustomDeserializer, CustomSerializer};
pub use enumeration::{EnumDeserializer, EnumSerializer};
pub use exception::{ErrorDeserializer, ErrorSerializer};
pub use leaf::{MarkerDeserializer, MarkerSerializer, ValueObjectDeserializer, ValueObjectSerializer};
pub use map::{MapDeserializer, MapSerializer};
pub use object::{ObjectDeserializer, ObjectSerializer};
pub use sequence::{SequenceDeserializer, SequenceSerializer};
pub use stream::{StreamDeserializer, StreamSerializer};

/// The primitive writer a codec encodes into.
pub trait ObjectOutput {
    /// Writes any value, dispatching on its runtime type.
    fn write_value(&mut self, value: &Value) -> Result<()>;
    /// Writes `null`.
    fn write_null(&mut self) -> Result<()>;
    /// Writes a boolean.
    fn write_bool(&mut self, value: bool) -> Result<()>;
    /// Writes a 32-bit integer.
    fn write_int(&mut self, value: i32) -> Result<()>;
    /// Writes a 64-bit integer.
    fn write_long(&mut self, value: i64) -> Result<()>;
    /// Writes a double.
    fn write_double(&mut self, value: f64) -> Result<()>;
    /// Writes a string.
    fn write_string(&mut self, value: &str) -> Result<()>;
    /// Writes a date as epoch milliseconds.
    fn write_date(&mut self, millis: i64) -> Result<()>;
    /// Writes a byte buffer.
    fn write_binary(&mut self, bytes: &[u8]) -> Result<()>;
    /// Starts a map. `None` writes an untyped map.
    fn write_map_begin(&mut self, type_name: Option<&str>) -> Result<()>;
    /// Ends a map.
    fn write_map_end(&mut self) -> Result<()>;
    /// Starts a list or array.
    fn write_list_begin(&mut self, len: Option<usize>, type_name: &str) -> Result<()>;
    /// Ends a list or array.
    fn write_list_end(&mut self) -> Result<()>;
    /// Starts a class-shaped instance. See the module docs for the three outcomes.
    fn write_object_begin(&mut self, class_name: &str) -> Result<ClassState>;
    /// Writes the field count of a new class definition.
    fn write_class_field_count(&mut self, count: usize) -> Result<()>;
    /// Reference check: emits a back-reference and returns `true` if `obj` was written
    /// earlier in this stream; otherwise registers it and returns `false`.
    fn add_ref(&mut self, obj: &ObjectRef) -> Result<bool>;
    /// Records a recovered problem.
    fn warn(&mut self, warning: Warning);
}

/// The primitive reader a codec decodes from.
pub trait ObjectInput {
    /// Reads any value.
    fn read_value(&mut self) -> Result<Value>;
    /// Reads any value, converting it to `expected` where the wire form allows.
    fn read_value_as(&mut self, expected: Option<&TypeDescriptor>) -> Result<Value>;
    /// Reads a string value.
    fn read_string(&mut self) -> Result<String>;
    /// Returns true if the next tag closes the current map or list.
    fn is_end(&mut self) -> Result<bool>;
    /// Consumes the end tag of a map or list.
    fn read_end(&mut self) -> Result<()>;
    /// Registers a new instance at the next reference index.
    fn add_ref(&mut self, obj: ObjectRef) -> u32;
    /// Substitutes the instance registered at `index`.
    fn replace_ref(&mut self, index: u32, obj: ObjectRef) -> Result<()>;
    /// Resolves a back-reference.
    fn resolve_ref(&mut self, index: u32) -> Result<ObjectRef>;
    /// Records a recovered problem.
    fn warn(&mut self, warning: Warning);
}

/// Encoder for one runtime type.
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Writes `value`, which has the type this serializer was resolved for.
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()>;
}

/// Decoder for one runtime type.
///
/// The `read_*` defaults consume the structure into a generic value before failing with
/// a type mismatch, so the stream and its reference table stay aligned and the caller
/// can recover.
pub trait Deserializer: Send + Sync + fmt::Debug {
    /// The type this decoder produces.
    fn own_type(&self) -> &TypeDescriptor;

    /// Whether decoded instances may replace themselves after construction.
    fn is_read_resolve(&self) -> bool {
        self.own_type()
            .capabilities()
            .contains(Capabilities::READ_RESOLVE)
    }

    /// Whether the type is a protocol-visible remote handle.
    fn is_remote_handle(&self) -> bool {
        self.own_type()
            .capabilities()
            .contains(Capabilities::REMOTE_HANDLE)
    }

    /// Reads the entries of a map whose start tag was consumed.
    fn read_map(&self, input: &mut dyn ObjectInput) -> Result<Value> {
        map::read_generic_map(input, None)?;
        Err(unsupported(self.own_type(), "a map"))
    }

    /// Reads the elements of a list whose header was consumed.
    fn read_list(&self, input: &mut dyn ObjectInput, len: Option<usize>) -> Result<Value> {
        sequence::read_generic_list(input, len)?;
        Err(unsupported(self.own_type(), "a list"))
    }

    /// Reads the field values of an instance of `def`.
    fn read_object(&self, input: &mut dyn ObjectInput, def: &ClassDefinition) -> Result<Value> {
        reject_layout(input, self.own_type(), def)
    }

    /// Converts a scalar read off the wire into this decoder's type.
    fn from_scalar(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            other => Err(HessianError::mismatch(
                self.own_type().name(),
                other.kind_name(),
            )),
        }
    }
}

fn unsupported(ty: &TypeDescriptor, found: &str) -> HessianError {
    HessianError::mismatch(ty.name(), found)
}

/// Consumes an instance whose class layout `ty`'s decoder cannot take, then fails with a
/// type mismatch so the caller can recover at the next value.
pub(crate) fn reject_layout(
    input: &mut dyn ObjectInput,
    ty: &TypeDescriptor,
    def: &ClassDefinition,
) -> Result<Value> {
    map::read_generic_object(input, def)?;
    Err(unsupported(
        ty,
        &format!("an instance of '{}' with fields {:?}", def.name, def.fields),
    ))
}

/// Writes the class header of `class_name` and reports whether the body must follow.
///
/// Returns `false` when the stream reported [`ClassState::AlreadyWritten`].
pub(crate) fn begin_class(
    out: &mut dyn ObjectOutput,
    class_name: &str,
    field_names: &[&str],
) -> Result<bool> {
    match out.write_object_begin(class_name)? {
        ClassState::AlreadyWritten => Ok(false),
        ClassState::Known(_) => Ok(true),
        ClassState::NewClass => {
            out.write_class_field_count(field_names.len())?;
            for name in field_names {
                out.write_string(name)?;
            }
            match out.write_object_begin(class_name)? {
                ClassState::AlreadyWritten => Ok(false),
                ClassState::Known(_) => Ok(true),
                ClassState::NewClass => Err(HessianError::Internal(format!(
                    "class '{class_name}' still unknown after its definition was written"
                ))),
            }
        }
    }
}
