//! The read side of the stream.
//!
//! [`HessianReader`] walks the tag grammar described in [`crate::format`] and hands every
//! structured value to the codec the [`SerializerFactory`] resolves for it. The reader
//! owns the decode-side instance table and class table; both are reset by
//! [`HessianReader::read_graph`], mirroring the writer.
//!
//! Class definitions (`C`) are not values: they are recorded and the reader moves on to
//! the value that follows.

use std::io::Read;

use crate::codec::{Deserializer as _, ObjectInput};
use crate::error::{HessianError, Result, Warning};
use crate::factory::SerializerFactory;
use crate::format::{ClassDefinition, list_length, tag};
use crate::refs::{ClassTable, InstanceTable};
use crate::types::TypeDescriptor;
use crate::value::{ObjectRef, Value};

/// Maximum nesting of maps, lists and objects in one graph.
///
/// Every level costs several stack frames on the decode path, so the limit has to fit a
/// default 2 MiB thread stack in unoptimized builds.
pub const MAX_DEPTH: usize = 128;

/// Decodes value graphs from a byte source.
#[derive(Debug)]
pub struct HessianReader<'f, R: Read> {
    factory: &'f SerializerFactory,
    source: R,
    peeked: Option<u8>,
    instances: InstanceTable,
    classes: ClassTable,
    warnings: Vec<Warning>,
    depth: usize,
}

impl<'f, R: Read> HessianReader<'f, R> {
    /// Creates a reader resolving codecs through `factory`.
    pub fn new(factory: &'f SerializerFactory, source: R) -> Self {
        Self {
            factory,
            source,
            peeked: None,
            instances: InstanceTable::new(),
            classes: ClassTable::new(),
            warnings: Vec::new(),
            depth: 0,
        }
    }

    /// Reads one complete graph with fresh instance and class tables.
    pub fn read_graph(&mut self) -> Result<Value> {
        self.read_graph_as(None)
    }

    /// [`Self::read_graph`], converting the root to `expected`.
    pub fn read_graph_as(&mut self, expected: Option<&TypeDescriptor>) -> Result<Value> {
        self.instances.clear();
        self.classes.clear();
        self.depth = 0;
        let value = self.read_value_as(expected)?;
        log::trace!(
            "[HessianReader] graph done: {} instances, {} classes",
            self.instances.len(),
            self.classes.definitions().len()
        );
        Ok(value)
    }

    /// Returns true once the source is exhausted.
    pub fn at_eof(&mut self) -> Result<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        match self.source.read(&mut byte)? {
            0 => Ok(true),
            _ => {
                self.peeked = Some(byte[0]);
                Ok(false)
            }
        }
    }

    /// Class definitions seen in the current graph.
    pub fn class_definitions(&self) -> &[ClassDefinition] {
        self.classes.definitions()
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Drains the recorded warnings.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Returns the source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn peek_tag(&mut self) -> Result<u8> {
        if let Some(t) = self.peeked {
            return Ok(t);
        }
        let t = self.take_u8()?;
        self.peeked = Some(t);
        Ok(t)
    }

    fn next_tag(&mut self) -> Result<u8> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.take_u8(),
        }
    }

    fn take_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.source.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn take_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    fn take_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    fn take_index(&mut self, what: &str) -> Result<u32> {
        let raw = self.take_i32()?;
        u32::try_from(raw).map_err(|_| HessianError::Protocol(format!("negative {what} index {raw}")))
    }

    /// Reads `len` bytes without trusting `len` for the allocation.
    fn take_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.source).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, stream ended after {}", buf.len()),
            )
            .into());
        }
        Ok(buf)
    }

    fn take_len32(&mut self) -> Result<usize> {
        let len = u32::from_be_bytes(self.take_array()?);
        Ok(len as usize)
    }

    fn take_utf8(&mut self, len: usize) -> Result<String> {
        let bytes = self.take_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| HessianError::Protocol(format!("invalid utf-8 in string: {e}")))
    }

    /// Reads a `u16`-length-prefixed type or class name.
    fn take_name(&mut self) -> Result<String> {
        let len = u16::from_be_bytes(self.take_array()?);
        self.take_utf8(usize::from(len))
    }

    fn define_class(&mut self) -> Result<()> {
        let name = self.take_name()?;
        let count = self.take_i32()?;
        let count = usize::try_from(count).map_err(|_| {
            HessianError::Protocol(format!("class '{name}' declares {count} fields"))
        })?;
        let mut fields = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            fields.push(self.read_string()?);
        }
        let index = self.classes.define(ClassDefinition::new(name, fields))?;
        log::trace!("[HessianReader] class definition #{index} recorded");
        Ok(())
    }

    fn scalar(&self, value: Value, expected: Option<&TypeDescriptor>) -> Result<Value> {
        match expected {
            Some(ty) => self.factory.get_deserializer(ty).from_scalar(value),
            None => Ok(value),
        }
    }

    fn structured(&mut self, t: u8, expected: Option<&TypeDescriptor>) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(HessianError::Protocol(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let result = self.structured_inner(t, expected);
        self.depth -= 1;
        result
    }

    fn structured_inner(&mut self, t: u8, expected: Option<&TypeDescriptor>) -> Result<Value> {
        let factory = self.factory;
        match t {
            tag::UNTYPED_MAP => match expected {
                Some(ty) => factory.get_deserializer(ty).read_map(self),
                None => factory.read_map(self, ""),
            },
            tag::TYPED_MAP => {
                let name = self.take_name()?;
                factory.read_map_as(self, &name, expected)
            }
            tag::LIST => {
                let name = self.take_name()?;
                let len = list_length(self.take_i32()?)?;
                factory.read_list_as(self, len, &name, expected)
            }
            tag::OBJECT => {
                let index = self.take_index("class")?;
                let def = self.classes.get(index)?.clone();
                factory.read_object(self, &def, expected)
            }
            other => Err(HessianError::Internal(format!(
                "tag 0x{other:02x} is not structured"
            ))),
        }
    }
}

impl<R: Read> ObjectInput for HessianReader<'_, R> {
    fn read_value(&mut self) -> Result<Value> {
        self.read_value_as(None)
    }

    fn read_value_as(&mut self, expected: Option<&TypeDescriptor>) -> Result<Value> {
        loop {
            let t = self.next_tag()?;
            let value = match t {
                tag::NULL => Value::Null,
                tag::TRUE => Value::Bool(true),
                tag::FALSE => Value::Bool(false),
                tag::INT => Value::Int(self.take_i32()?),
                tag::LONG => Value::Long(self.take_i64()?),
                tag::DOUBLE => Value::Double(f64::from_be_bytes(self.take_array()?)),
                tag::DATE => Value::Date(self.take_i64()?),
                tag::STRING => {
                    let len = self.take_len32()?;
                    Value::String(self.take_utf8(len)?)
                }
                tag::BINARY => {
                    let len = self.take_len32()?;
                    Value::Binary(self.take_bytes(len)?)
                }
                tag::CLASS_DEF => {
                    self.define_class()?;
                    continue;
                }
                tag::BACK_REF => {
                    let index = self.take_index("back-reference")?;
                    return Ok(Value::Ref(self.resolve_ref(index)?));
                }
                tag::UNTYPED_MAP | tag::TYPED_MAP | tag::LIST | tag::OBJECT => {
                    return self.structured(t, expected);
                }
                tag::END => {
                    return Err(HessianError::Protocol(
                        "unexpected end marker 'Z' outside a map or list".into(),
                    ));
                }
                other => {
                    return Err(HessianError::Protocol(format!(
                        "unknown tag 0x{other:02x}"
                    )));
                }
            };
            return self.scalar(value, expected);
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.read_value()? {
            Value::String(s) => Ok(s),
            other => Err(HessianError::mismatch("string", other.kind_name())),
        }
    }

    fn is_end(&mut self) -> Result<bool> {
        Ok(self.peek_tag()? == tag::END)
    }

    fn read_end(&mut self) -> Result<()> {
        match self.next_tag()? {
            tag::END => Ok(()),
            other => Err(HessianError::Protocol(format!(
                "expected end marker 'Z', found tag 0x{other:02x}"
            ))),
        }
    }

    fn add_ref(&mut self, obj: ObjectRef) -> u32 {
        self.instances.register(obj)
    }

    fn replace_ref(&mut self, index: u32, obj: ObjectRef) -> Result<()> {
        self.instances.replace(index, obj)
    }

    fn resolve_ref(&mut self, index: u32) -> Result<ObjectRef> {
        self.instances.resolve(index)
    }

    fn warn(&mut self, warning: Warning) {
        log::warn!("[HessianReader] {warning}");
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bytes: &[u8]) -> Result<Value> {
        let factory = SerializerFactory::new();
        HessianReader::new(&factory, bytes).read_graph()
    }

    #[test]
    fn scalars() -> Result<()> {
        assert!(matches!(read(&[b'I', 0, 0, 1, 0])?, Value::Int(256)));
        assert!(matches!(read(b"T")?, Value::Bool(true)));
        assert!(matches!(read(&[b'S', 0, 0, 0, 2, b'o', b'k'])?, Value::String(s) if s == "ok"));
        Ok(())
    }

    #[test]
    fn stray_end_and_unknown_tags_are_protocol_errors() {
        assert!(matches!(read(b"Z"), Err(HessianError::Protocol(_))));
        assert!(matches!(read(b"?"), Err(HessianError::Protocol(_))));
    }

    #[test]
    fn truncated_string_is_eof() {
        let err = read(&[b'S', 0, 0, 0, 9, b'a']);
        assert!(matches!(err, Err(HessianError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn undefined_class_index() {
        assert!(matches!(read(&[b'O', 0, 0, 0, 3]), Err(HessianError::Protocol(_))));
    }

    #[test]
    fn expected_type_narrows_scalars() -> Result<()> {
        let factory = SerializerFactory::new();
        let short = crate::types::builtin::primitive(crate::types::PrimitiveKind::Short);
        let bytes = [b'I', 0, 0, 0, 7];
        let v = HessianReader::new(&factory, &bytes[..]).read_graph_as(Some(&short))?;
        assert!(matches!(v, Value::Short(7)));
        Ok(())
    }
}
