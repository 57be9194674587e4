//! The high-level entry points.
//!
//! [`Hessian`] encodes and decodes whole graphs through the process-wide
//! [`SerializerFactory::global`]. [`HessianOptions`], obtained from [`Hessian::builder`],
//! selects a different factory, a declared root type and strict mode.
//!
//! Every call encodes or decodes one independent graph with fresh reference and class
//! tables. The batch calls run independent graphs in parallel on rayon's pool; the
//! factory's caches are shared between them.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::error::{HessianError, Result, Warning};
use crate::factory::SerializerFactory;
use crate::io::HessianWriter;
use crate::reader::HessianReader;
use crate::rt::WireObject;
use crate::types::TypeDescriptor;
use crate::value::Value;

/// The main entry point.
#[derive(Debug)]
pub struct Hessian;

impl Hessian {
    /// Creates an options builder using the global factory.
    pub fn builder() -> HessianOptions<'static> {
        HessianOptions::new(SerializerFactory::global())
    }

    /// Encodes `value` into a byte vector.
    pub fn serialize(value: &Value) -> Result<Vec<u8>> {
        Self::builder().serialize(value)
    }

    /// Decodes one graph from `bytes`.
    pub fn deserialize(bytes: &[u8]) -> Result<Value> {
        Self::builder().deserialize(bytes)
    }

    /// Encodes `value` into a file.
    pub fn save<P: AsRef<Path>>(path: P, value: &Value) -> Result<()> {
        Self::builder().save(path, value)
    }

    /// Decodes one graph from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Value> {
        Self::builder().load(path)
    }
}

/// The output of [`HessianOptions::encode`].
#[derive(Debug, Clone)]
pub struct Encoded {
    /// The stream.
    pub bytes: Vec<u8>,
    /// Problems recovered while encoding.
    pub warnings: Vec<Warning>,
}

/// The output of [`HessianOptions::decode`].
#[derive(Debug, Clone)]
pub struct Decoded {
    /// The root of the graph.
    pub value: Value,
    /// Problems recovered while decoding. Non-empty means some fields are null or missing.
    pub warnings: Vec<Warning>,
}

/// Configuration builder for encode and decode calls.
#[derive(Debug, Clone)]
pub struct HessianOptions<'f> {
    factory: &'f SerializerFactory,
    expected: Option<TypeDescriptor>,
    strict: bool,
}

impl<'f> HessianOptions<'f> {
    /// Creates options resolving codecs through `factory`.
    pub fn new(factory: &'f SerializerFactory) -> Self {
        Self {
            factory,
            expected: None,
            strict: false,
        }
    }

    /// Uses a different factory.
    pub fn factory<'g>(self, factory: &'g SerializerFactory) -> HessianOptions<'g> {
        HessianOptions {
            factory,
            expected: self.expected,
            strict: self.strict,
        }
    }

    /// Declares the type the decoded root should have.
    #[must_use]
    pub fn expect(mut self, ty: TypeDescriptor) -> Self {
        self.expected = Some(ty);
        self
    }

    /// In strict mode a result carrying warnings fails with [`HessianError::Incomplete`].
    #[must_use]
    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Encodes `value`, returning the bytes with any warnings.
    pub fn encode(&self, value: &Value) -> Result<Encoded> {
        let mut writer = HessianWriter::new(self.factory, Vec::new());
        writer.write_graph(value)?;
        let warnings = writer.take_warnings();
        self.check(&warnings)?;
        Ok(Encoded {
            bytes: writer.into_inner(),
            warnings,
        })
    }

    /// Decodes one graph, returning the value with any warnings.
    pub fn decode(&self, bytes: &[u8]) -> Result<Decoded> {
        let mut reader = HessianReader::new(self.factory, bytes);
        let value = reader.read_graph_as(self.expected.as_ref())?;
        self.finish(reader.take_warnings(), value)
    }

    /// Encodes `value` into a byte vector.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        self.encode(value).map(|e| e.bytes)
    }

    /// Decodes one graph from `bytes`.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        self.decode(bytes).map(|d| d.value)
    }

    /// Encodes a typed value.
    pub fn to_bytes<T: WireObject>(&self, value: &T) -> Result<Vec<u8>> {
        self.serialize(&value.to_value())
    }

    /// Decodes a typed value. The declared root type is `T`'s own.
    pub fn from_bytes<T: WireObject>(&self, bytes: &[u8]) -> Result<T> {
        let ty = T::type_descriptor();
        let mut reader = HessianReader::new(self.factory, bytes);
        let value = reader.read_graph_as(Some(&ty))?;
        let value = self.finish(reader.take_warnings(), value)?.value;
        T::from_value(&value)
    }

    /// Encodes independent graphs in parallel.
    pub fn serialize_all(&self, values: &[Value]) -> Result<Vec<Vec<u8>>> {
        values.par_iter().map(|v| self.serialize(v)).collect()
    }

    /// Decodes independent graphs in parallel.
    pub fn deserialize_all<B>(&self, streams: &[B]) -> Result<Vec<Value>>
    where
        B: AsRef<[u8]> + Sync,
    {
        streams
            .par_iter()
            .map(|bytes| self.deserialize(bytes.as_ref()))
            .collect()
    }

    /// Encodes `value` into a file.
    pub fn save<P: AsRef<Path>>(&self, path: P, value: &Value) -> Result<()> {
        let path = path.as_ref();
        let mut writer = HessianWriter::new(self.factory, BufWriter::new(File::create(path)?));
        writer.write_graph(value)?;
        let warnings = writer.take_warnings();
        self.check(&warnings)?;
        let mut sink = writer.into_inner();
        sink.flush()?;
        log::debug!("[Hessian::save] wrote {}", path.display());
        Ok(())
    }

    /// Decodes one graph from a file.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Value> {
        let file = File::open(path.as_ref())?;
        let mut reader = HessianReader::new(self.factory, BufReader::new(file));
        let value = reader.read_graph_as(self.expected.as_ref())?;
        if !reader.at_eof()? {
            return Err(HessianError::Protocol(format!(
                "trailing bytes after the graph in {}",
                path.as_ref().display()
            )));
        }
        self.finish(reader.take_warnings(), value).map(|d| d.value)
    }

    fn check(&self, warnings: &[Warning]) -> Result<()> {
        if self.strict && !warnings.is_empty() {
            return Err(HessianError::Incomplete(warnings.to_vec()));
        }
        Ok(())
    }

    fn finish(&self, warnings: Vec<Warning>, value: Value) -> Result<Decoded> {
        self.check(&warnings)?;
        Ok(Decoded { value, warnings })
    }
}
