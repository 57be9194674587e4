//! The write side of the stream.
//!
//! [`HessianWriter`] is the primitive writer the codecs encode into. It owns the
//! encode-side reference and class-definition tables for one top-level graph at a time:
//! [`HessianWriter::write_graph`] clears both before it starts, so nothing leaks from
//! one graph into the next even when the writer is reused.

use std::io::Write;

use crate::codec::{ObjectOutput, Serializer as _};
use crate::error::{HessianError, Result, Warning};
use crate::factory::SerializerFactory;
use crate::format::{ClassState, UNKNOWN_LENGTH, tag};
use crate::refs::{ClassDefinitionTable, ReferenceTable};
use crate::value::{ObjectRef, Value};

/// Encodes value graphs into a byte sink.
#[derive(Debug)]
pub struct HessianWriter<'f, W: Write> {
    factory: &'f SerializerFactory,
    sink: W,
    refs: ReferenceTable,
    classes: ClassDefinitionTable,
    warnings: Vec<Warning>,
}

impl<'f, W: Write> HessianWriter<'f, W> {
    /// Creates a writer resolving codecs through `factory`.
    pub fn new(factory: &'f SerializerFactory, sink: W) -> Self {
        Self {
            factory,
            sink,
            refs: ReferenceTable::new(),
            classes: ClassDefinitionTable::new(),
            warnings: Vec::new(),
        }
    }

    /// Writes one complete graph rooted at `value`, with fresh reference and class tables.
    pub fn write_graph(&mut self, value: &Value) -> Result<()> {
        self.refs.clear();
        self.classes.clear();
        self.write_value(value)?;
        log::trace!(
            "[HessianWriter] graph done: {} instances, {} classes",
            self.refs.len(),
            self.classes.len()
        );
        self.sink.flush()?;
        Ok(())
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Drains the recorded warnings.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        Ok(())
    }

    fn put_tag(&mut self, t: u8) -> Result<()> {
        self.put(&[t])
    }

    fn put_i32(&mut self, v: i32) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// Writes a `u16`-length-prefixed type or class name.
    fn put_name(&mut self, name: &str) -> Result<()> {
        let len = u16::try_from(name.len()).map_err(|_| {
            HessianError::Protocol(format!(
                "type name of {} bytes exceeds the u16 length prefix",
                name.len()
            ))
        })?;
        self.put(&len.to_be_bytes())?;
        self.put(name.as_bytes())
    }

    fn put_len(&mut self, len: usize, what: &str) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| {
            HessianError::Protocol(format!("{what} of {len} bytes exceeds the u32 length prefix"))
        })?;
        self.put(&len.to_be_bytes())
    }

    fn put_index(&mut self, index: u32) -> Result<()> {
        let index = i32::try_from(index)
            .map_err(|_| HessianError::Internal(format!("index {index} does not fit the wire")))?;
        self.put_i32(index)
    }
}

impl<W: Write> ObjectOutput for HessianWriter<'_, W> {
    fn write_value(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return self.write_null();
        }
        let serializer = self.factory.get_serializer(&value.type_descriptor());
        serializer.write_object(value, self)
    }

    fn write_null(&mut self) -> Result<()> {
        self.put_tag(tag::NULL)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put_tag(if value { tag::TRUE } else { tag::FALSE })
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.put_tag(tag::INT)?;
        self.put_i32(value)
    }

    fn write_long(&mut self, value: i64) -> Result<()> {
        self.put_tag(tag::LONG)?;
        self.put(&value.to_be_bytes())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.put_tag(tag::DOUBLE)?;
        self.put(&value.to_be_bytes())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.put_tag(tag::STRING)?;
        self.put_len(value.len(), "string")?;
        self.put(value.as_bytes())
    }

    fn write_date(&mut self, millis: i64) -> Result<()> {
        self.put_tag(tag::DATE)?;
        self.put(&millis.to_be_bytes())
    }

    fn write_binary(&mut self, bytes: &[u8]) -> Result<()> {
        self.put_tag(tag::BINARY)?;
        self.put_len(bytes.len(), "binary")?;
        self.put(bytes)
    }

    fn write_map_begin(&mut self, type_name: Option<&str>) -> Result<()> {
        match type_name {
            None => self.put_tag(tag::UNTYPED_MAP),
            Some(name) => {
                self.put_tag(tag::TYPED_MAP)?;
                self.put_name(name)
            }
        }
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.put_tag(tag::END)
    }

    fn write_list_begin(&mut self, len: Option<usize>, type_name: &str) -> Result<()> {
        self.put_tag(tag::LIST)?;
        self.put_name(type_name)?;
        let len = match len {
            Some(n) => i32::try_from(n).map_err(|_| {
                HessianError::Protocol(format!("list of {n} elements exceeds the i32 length"))
            })?,
            None => UNKNOWN_LENGTH,
        };
        self.put_i32(len)
    }

    fn write_list_end(&mut self) -> Result<()> {
        self.put_tag(tag::END)
    }

    fn write_object_begin(&mut self, class_name: &str) -> Result<ClassState> {
        if let Some(index) = self.classes.get(class_name) {
            self.put_tag(tag::OBJECT)?;
            self.put_index(index)?;
            return Ok(ClassState::Known(index));
        }
        let index = self.classes.insert(class_name);
        log::trace!("[HessianWriter] class '{class_name}' defined as #{index}");
        self.put_tag(tag::CLASS_DEF)?;
        self.put_name(class_name)?;
        Ok(ClassState::NewClass)
    }

    fn write_class_field_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| HessianError::Protocol(format!("{count} fields exceed the i32 count")))?;
        self.put_i32(count)
    }

    fn add_ref(&mut self, obj: &ObjectRef) -> Result<bool> {
        match self.refs.lookup_or_insert(obj) {
            Some(index) => {
                self.put_tag(tag::BACK_REF)?;
                self.put_index(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn warn(&mut self, warning: Warning) {
        log::warn!("[HessianWriter] {warning}");
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_big_endian() -> Result<()> {
        let factory = SerializerFactory::new();
        let mut writer = HessianWriter::new(&factory, Vec::new());
        writer.write_graph(&Value::Int(0x0102_0304))?;
        writer.write_graph(&Value::String("hi".into()))?;
        writer.write_graph(&Value::Null)?;
        assert_eq!(
            writer.into_inner(),
            vec![b'I', 1, 2, 3, 4, b'S', 0, 0, 0, 2, b'h', b'i', b'N']
        );
        Ok(())
    }

    #[test]
    fn second_begin_is_known() -> Result<()> {
        let factory = SerializerFactory::new();
        let mut writer = HessianWriter::new(&factory, Vec::new());
        assert_eq!(writer.write_object_begin("P")?, ClassState::NewClass);
        assert_eq!(writer.write_object_begin("P")?, ClassState::Known(0));
        assert_eq!(writer.write_object_begin("Q")?, ClassState::NewClass);
        assert_eq!(writer.write_object_begin("Q")?, ClassState::Known(1));
        Ok(())
    }
}
