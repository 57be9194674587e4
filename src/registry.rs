//! The primitive codec table.
//!
//! Maps well-known types to dedicated codecs and unique wire names: every built-in
//! scalar, its array form, and the platform value types (decimal, guid, locale, null
//! marker). The standard table is built once per process and shared; it is immutable
//! after construction.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::codec::{
    ArrayDeserializer, ArraySerializer, BasicDeserializer, BasicSerializer, Deserializer,
    MarkerDeserializer, MarkerSerializer, Serializer, ValueObjectDeserializer,
    ValueObjectSerializer,
};
use crate::types::{PrimitiveKind, TypeDescriptor, builtin};

/// One table entry.
#[derive(Debug, Clone)]
pub struct PrimitiveEntry {
    /// The type this entry dispatches on.
    pub ty: TypeDescriptor,
    /// The type's unique wire name.
    pub wire_name: String,
    /// Encoder.
    pub serializer: Arc<dyn Serializer>,
    /// Decoder.
    pub deserializer: Arc<dyn Deserializer>,
}

/// Type -> codec and wire name -> decoder table.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveTable {
    by_type: HashMap<TypeDescriptor, PrimitiveEntry>,
    by_wire_name: HashMap<String, Arc<dyn Deserializer>>,
}

static STANDARD: LazyLock<Arc<PrimitiveTable>> =
    LazyLock::new(|| Arc::new(PrimitiveTable::scalars().with_platform_types()));

impl PrimitiveTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide standard table: scalars, scalar arrays and platform types.
    pub fn standard() -> Arc<PrimitiveTable> {
        STANDARD.clone()
    }

    /// Scalars and their arrays only.
    pub fn scalars() -> Self {
        let mut table = Self::new();
        for kind in PrimitiveKind::ALL {
            let scalar = builtin::primitive(kind);
            let decoder: Arc<dyn Deserializer> = Arc::new(BasicDeserializer::new(kind));
            table.register(
                scalar,
                kind.wire_name(),
                Arc::new(BasicSerializer::new(kind)),
                decoder.clone(),
            );

            if let Some(array) = builtin::primitive_array(kind) {
                let wire_name = array.name().to_owned();
                table.register(
                    array.clone(),
                    wire_name,
                    Arc::new(ArraySerializer::new(array.clone())),
                    Arc::new(ArrayDeserializer::new(array, decoder)),
                );
            }
        }
        table
    }

    /// Adds the platform value types.
    #[must_use]
    pub fn with_platform_types(mut self) -> Self {
        for ty in [builtin::decimal(), builtin::guid(), builtin::locale()] {
            let wire_name = ty.name().to_owned();
            self.register(
                ty.clone(),
                wire_name.clone(),
                Arc::new(ValueObjectSerializer::new(wire_name)),
                Arc::new(ValueObjectDeserializer::new(ty)),
            );
        }
        let dbnull = builtin::dbnull();
        self.register(
            dbnull.clone(),
            builtin::DBNULL_WIRE_NAME,
            Arc::new(MarkerSerializer::new(builtin::DBNULL_WIRE_NAME)),
            Arc::new(MarkerDeserializer::new(dbnull)),
        );
        self
    }

    /// Registers a codec pair. Idempotent: the first registration of a type or wire name
    /// wins and later ones are ignored.
    pub fn register(
        &mut self,
        ty: TypeDescriptor,
        wire_name: impl Into<String>,
        serializer: Arc<dyn Serializer>,
        deserializer: Arc<dyn Deserializer>,
    ) {
        let wire_name = wire_name.into();
        if self.by_type.contains_key(&ty) {
            log::trace!("[PrimitiveTable::register] '{}' already registered", ty.name());
            return;
        }
        self.by_wire_name
            .entry(wire_name.clone())
            .or_insert_with(|| deserializer.clone());
        self.by_type.insert(
            ty.clone(),
            PrimitiveEntry {
                ty,
                wire_name,
                serializer,
                deserializer,
            },
        );
    }

    /// Encoder registered for `ty`.
    pub fn serializer(&self, ty: &TypeDescriptor) -> Option<Arc<dyn Serializer>> {
        self.by_type.get(ty).map(|e| e.serializer.clone())
    }

    /// Decoder registered for `ty`.
    pub fn deserializer(&self, ty: &TypeDescriptor) -> Option<Arc<dyn Deserializer>> {
        self.by_type.get(ty).map(|e| e.deserializer.clone())
    }

    /// Decoder registered under a wire name.
    pub fn deserializer_by_name(&self, wire_name: &str) -> Option<Arc<dyn Deserializer>> {
        self.by_wire_name.get(wire_name).cloned()
    }

    /// The full entry for `ty`.
    pub fn entry(&self, ty: &TypeDescriptor) -> Option<&PrimitiveEntry> {
        self.by_type.get(ty)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
