//! The serializer factory: one owning handle over the primitive table, the loaded type
//! spaces and the two codec caches.
//!
//! ## Type resolution (encode and decode)
//!
//! 1. Primitive table hit: returned directly, never cached.
//! 2. Cache hit by full type name.
//! 3. Capability classification (see [`crate::resolver`]), then build-once insert into
//!    the direction's cache. Array element codecs are resolved before the cache lock is
//!    taken, so building never re-enters a cache.
//!
//! ## Wire-name resolution (decode)
//!
//! 1. Primitive table wire-name index.
//! 2. `"[" + T`: resolve `T` recursively and wrap it in an array decoder, cached under
//!    the array's wire name.
//! 3. Search the loaded type spaces in load order, then resolve the found type.
//! 4. Otherwise unresolved. This is not an error: the `read_*` entry points fall back to
//!    the generic map or list and record a [`Warning::UnresolvedType`].

use std::sync::{Arc, OnceLock};

use crate::cache::CodecCache;
use crate::codec::{
    ArrayDeserializer, ArraySerializer, CustomDeserializer, CustomSerializer, Deserializer,
    EnumDeserializer, EnumSerializer, ErrorDeserializer, ErrorSerializer, MapDeserializer,
    MapSerializer, ObjectDeserializer, ObjectInput, ObjectSerializer, SequenceDeserializer,
    SequenceSerializer, Serializer, StreamDeserializer, StreamSerializer,
};
use crate::error::{Result, Warning};
use crate::format::{ARRAY_PREFIX, ClassDefinition};
use crate::registry::PrimitiveTable;
use crate::resolver::{Capability, Direction, classify};
use crate::types::{TypeDescriptor, TypeSpace, TypeSpaces};
use crate::value::Value;

static GLOBAL: OnceLock<SerializerFactory> = OnceLock::new();

/// Resolves codecs for types and wire names.
///
/// Cheap to share by reference across threads; all interior state is either immutable
/// or behind the caches' own synchronization.
#[derive(Debug)]
pub struct SerializerFactory {
    primitives: Arc<PrimitiveTable>,
    type_spaces: TypeSpaces,
    serializers: CodecCache<dyn Serializer>,
    deserializers: CodecCache<dyn Deserializer>,
    generic_map: Arc<MapDeserializer>,
    generic_list: Arc<SequenceDeserializer>,
}

impl Default for SerializerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerFactory {
    /// A fresh factory over the standard primitive table, with no type spaces loaded.
    pub fn new() -> Self {
        Self::with_table(PrimitiveTable::standard())
    }

    /// A fresh factory over `primitives`.
    pub fn with_table(primitives: Arc<PrimitiveTable>) -> Self {
        Self {
            primitives,
            type_spaces: TypeSpaces::new(),
            serializers: CodecCache::new("encode"),
            deserializers: CodecCache::new("decode"),
            generic_map: Arc::new(MapDeserializer::generic()),
            generic_list: Arc::new(SequenceDeserializer::generic()),
        }
    }

    /// Starts a customized factory.
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::default()
    }

    /// The process-wide default factory, created on first use.
    pub fn global() -> &'static SerializerFactory {
        GLOBAL.get_or_init(SerializerFactory::new)
    }

    /// The primitive table.
    pub fn primitives(&self) -> &PrimitiveTable {
        &self.primitives
    }

    /// The loaded type spaces.
    pub fn type_spaces(&self) -> &TypeSpaces {
        &self.type_spaces
    }

    /// Makes a type space searchable by wire name. Spaces are searched in load order.
    pub fn load_type_space(&self, space: TypeSpace) {
        self.type_spaces.load(space);
    }

    /// Number of cached (serializer, deserializer) entries.
    pub fn cached(&self) -> (usize, usize) {
        (self.serializers.len(), self.deserializers.len())
    }

    // --- Encode ---

    /// The serializer for values of type `ty`.
    pub fn get_serializer(&self, ty: &TypeDescriptor) -> Arc<dyn Serializer> {
        if let Some(table) = self.primitives.serializer(ty) {
            return table;
        }
        self.serializers.get_or_create(ty.name(), || {
            let capability = classify(ty, Direction::Encode);
            log::debug!(
                "[SerializerFactory] serializer for '{}' via {capability:?}",
                ty.name()
            );
            build_serializer(ty, capability)
        })
    }

    /// The serializer for an object whose declared type is `expected`.
    pub fn get_object_serializer(&self, expected: &TypeDescriptor) -> Arc<dyn Serializer> {
        self.get_serializer(expected)
    }

    // --- Decode by type ---

    /// The deserializer producing values of type `ty`.
    pub fn get_deserializer(&self, ty: &TypeDescriptor) -> Arc<dyn Deserializer> {
        if let Some(table) = self.primitives.deserializer(ty) {
            return table;
        }
        if let Some(cached) = self.deserializers.get(ty.name()) {
            return cached;
        }
        match classify(ty, Direction::Decode) {
            // Not a wire type of its own: the wrapped type's decoder, uncached.
            Capability::Nullable(inner) => self.get_deserializer(&inner),
            Capability::Array(element) => {
                let element = self.get_deserializer(&element);
                self.deserializers.get_or_create(ty.name(), || {
                    log::debug!("[SerializerFactory] array deserializer for '{}'", ty.name());
                    Arc::new(ArrayDeserializer::new(ty.clone(), element))
                })
            }
            capability => self.deserializers.get_or_create(ty.name(), || {
                log::debug!(
                    "[SerializerFactory] deserializer for '{}' via {capability:?}",
                    ty.name()
                );
                build_deserializer(ty, capability)
            }),
        }
    }

    // --- Decode by wire name ---

    /// The deserializer for a wire type name, or `None` if no loaded type matches.
    pub fn get_deserializer_by_name(&self, wire_name: &str) -> Option<Arc<dyn Deserializer>> {
        if wire_name.is_empty() {
            return None;
        }
        if let Some(table) = self.primitives.deserializer_by_name(wire_name) {
            return Some(table);
        }
        if let Some(cached) = self.deserializers.get(wire_name) {
            return Some(cached);
        }
        if let Some(element_name) = wire_name.strip_prefix(ARRAY_PREFIX) {
            let element = self.get_deserializer_by_name(element_name)?;
            return Some(self.deserializers.get_or_create(wire_name, || {
                log::debug!("[SerializerFactory] array deserializer for wire name '{wire_name}'");
                Arc::new(ArrayDeserializer::of(element))
            }));
        }
        match self.type_spaces.find(wire_name) {
            Some(ty) => Some(self.get_deserializer(&ty)),
            None => {
                log::debug!("[SerializerFactory] wire name '{wire_name}' is not loaded");
                None
            }
        }
    }

    /// The deserializer for an object sent as `wire_name` where `expected` is declared.
    ///
    /// The name-resolved decoder (the generic map if unresolved) is kept when `expected`
    /// is absent, the same type, a supertype, or when the decoder is read-resolve or a
    /// remote handle. Otherwise `expected`'s own decoder is used.
    pub fn get_object_deserializer(
        &self,
        wire_name: &str,
        expected: Option<&TypeDescriptor>,
    ) -> Arc<dyn Deserializer> {
        let named = self
            .get_deserializer_by_name(wire_name)
            .unwrap_or_else(|| self.generic_map.clone() as Arc<dyn Deserializer>);
        self.prefer_expected(named, expected, true)
    }

    /// The deserializer for a list sent as `wire_name` where `expected` is declared.
    ///
    /// Like [`Self::get_object_deserializer`] without the read-resolve and remote-handle
    /// exemptions; unresolved names fall back to the generic list.
    pub fn get_list_deserializer(
        &self,
        wire_name: &str,
        expected: Option<&TypeDescriptor>,
    ) -> Arc<dyn Deserializer> {
        let named = self
            .get_deserializer_by_name(wire_name)
            .unwrap_or_else(|| self.generic_list.clone() as Arc<dyn Deserializer>);
        self.prefer_expected(named, expected, false)
    }

    fn prefer_expected(
        &self,
        named: Arc<dyn Deserializer>,
        expected: Option<&TypeDescriptor>,
        object_rules: bool,
    ) -> Arc<dyn Deserializer> {
        let Some(expected) = expected else {
            return named;
        };
        let own = named.own_type();
        let keep = expected.ptr_eq(own)
            || expected.is_assignable_from(own)
            || (object_rules && (named.is_read_resolve() || named.is_remote_handle()));
        if keep {
            named
        } else {
            log::trace!(
                "[SerializerFactory] '{}' overridden by expected '{}'",
                own.name(),
                expected.name()
            );
            self.get_deserializer(expected)
        }
    }

    // --- Reads on behalf of the stream ---

    /// Reads a map sent as `wire_name`; unresolved names decode as a generic map.
    pub fn read_map(&self, input: &mut dyn ObjectInput, wire_name: &str) -> Result<Value> {
        self.read_map_as(input, wire_name, None)
    }

    /// [`Self::read_map`] with a declared target type.
    pub fn read_map_as(
        &self,
        input: &mut dyn ObjectInput,
        wire_name: &str,
        expected: Option<&TypeDescriptor>,
    ) -> Result<Value> {
        match self.get_deserializer_by_name(wire_name) {
            Some(named) => self.prefer_expected(named, expected, true).read_map(input),
            None => match expected {
                Some(expected) if !expected.ptr_eq(self.generic_map.own_type()) => {
                    self.get_deserializer(expected).read_map(input)
                }
                _ => {
                    let wire_name = (!wire_name.is_empty()).then_some(wire_name);
                    if let Some(name) = wire_name {
                        unresolved(input, name);
                    }
                    self.generic_map.read_map_named(input, wire_name)
                }
            },
        }
    }

    /// Reads a list of `len` elements sent as `wire_name`; unresolved names decode as a
    /// generic list.
    pub fn read_list(
        &self,
        input: &mut dyn ObjectInput,
        len: Option<usize>,
        wire_name: &str,
    ) -> Result<Value> {
        self.read_list_as(input, len, wire_name, None)
    }

    /// [`Self::read_list`] with a declared target type.
    pub fn read_list_as(
        &self,
        input: &mut dyn ObjectInput,
        len: Option<usize>,
        wire_name: &str,
        expected: Option<&TypeDescriptor>,
    ) -> Result<Value> {
        let decoder = match self.get_deserializer_by_name(wire_name) {
            Some(named) => self.prefer_expected(named, expected, false),
            None => {
                if !wire_name.is_empty() && expected.is_none() {
                    unresolved(input, wire_name);
                }
                self.prefer_expected(self.generic_list.clone(), expected, false)
            }
        };
        decoder.read_list(input, len)
    }

    /// Reads the field values of an instance of `def`.
    pub fn read_object(
        &self,
        input: &mut dyn ObjectInput,
        def: &ClassDefinition,
        expected: Option<&TypeDescriptor>,
    ) -> Result<Value> {
        let decoder = match self.get_deserializer_by_name(&def.name) {
            Some(named) => self.prefer_expected(named, expected, true),
            None => match expected {
                Some(expected) if !expected.ptr_eq(self.generic_map.own_type()) => {
                    self.get_deserializer(expected)
                }
                _ => {
                    unresolved(input, &def.name);
                    self.generic_map.clone() as Arc<dyn Deserializer>
                }
            },
        };
        decoder.read_object(input, def)
    }
}

fn unresolved(input: &mut dyn ObjectInput, wire_name: &str) {
    input.warn(Warning::UnresolvedType {
        wire_name: wire_name.to_owned(),
    });
}

fn build_serializer(ty: &TypeDescriptor, capability: Capability) -> Arc<dyn Serializer> {
    let ty = ty.clone();
    match capability {
        Capability::Map => Arc::new(MapSerializer::new(ty)),
        Capability::Array(_) => Arc::new(ArraySerializer::new(ty)),
        Capability::Enumeration => Arc::new(EnumSerializer::new(ty)),
        Capability::Sequence => Arc::new(SequenceSerializer::new(ty)),
        Capability::Stream => Arc::new(StreamSerializer::new(ty)),
        Capability::Error => Arc::new(ErrorSerializer::new(ty)),
        Capability::Custom(contract) => Arc::new(CustomSerializer::new(ty, contract)),
        Capability::Nullable(_) | Capability::Reflective => Arc::new(ObjectSerializer::new(ty)),
    }
}

fn build_deserializer(ty: &TypeDescriptor, capability: Capability) -> Arc<dyn Deserializer> {
    let ty = ty.clone();
    match capability {
        Capability::Map => Arc::new(MapDeserializer::new(ty)),
        Capability::Enumeration => Arc::new(EnumDeserializer::new(ty)),
        Capability::Sequence => Arc::new(SequenceDeserializer::new(ty)),
        Capability::Stream => Arc::new(StreamDeserializer::new(ty)),
        Capability::Error => Arc::new(ErrorDeserializer::new(ty)),
        Capability::Custom(contract) => Arc::new(CustomDeserializer::new(ty, contract)),
        // Handled by the caller before the cache is entered.
        Capability::Nullable(_) | Capability::Array(_) | Capability::Reflective => {
            Arc::new(ObjectDeserializer::new(ty))
        }
    }
}

/// Builder for a customized [`SerializerFactory`].
#[derive(Debug)]
pub struct FactoryBuilder {
    platform_types: bool,
    leaves: Vec<LeafRegistration>,
    spaces: Vec<TypeSpace>,
}

#[derive(Debug)]
struct LeafRegistration {
    ty: TypeDescriptor,
    wire_name: String,
    serializer: Arc<dyn Serializer>,
    deserializer: Arc<dyn Deserializer>,
}

impl Default for FactoryBuilder {
    fn default() -> Self {
        Self {
            platform_types: true,
            leaves: Vec::new(),
            spaces: Vec::new(),
        }
    }
}

impl FactoryBuilder {
    /// Includes the platform value types (decimal, guid, locale, null marker). On by
    /// default.
    #[must_use]
    pub fn platform_types(mut self, enabled: bool) -> Self {
        self.platform_types = enabled;
        self
    }

    /// Registers an application leaf codec in the primitive table.
    #[must_use]
    pub fn leaf(
        mut self,
        ty: TypeDescriptor,
        wire_name: impl Into<String>,
        serializer: Arc<dyn Serializer>,
        deserializer: Arc<dyn Deserializer>,
    ) -> Self {
        self.leaves.push(LeafRegistration {
            ty,
            wire_name: wire_name.into(),
            serializer,
            deserializer,
        });
        self
    }

    /// Loads a type space into the new factory.
    #[must_use]
    pub fn type_space(mut self, space: TypeSpace) -> Self {
        self.spaces.push(space);
        self
    }

    /// Builds the factory. The standard table is shared unless leaves were added or the
    /// platform types were turned off.
    pub fn build(self) -> SerializerFactory {
        let table = if self.platform_types && self.leaves.is_empty() {
            PrimitiveTable::standard()
        } else {
            let mut table = if self.platform_types {
                PrimitiveTable::scalars().with_platform_types()
            } else {
                PrimitiveTable::scalars()
            };
            for leaf in self.leaves {
                table.register(leaf.ty, leaf.wire_name, leaf.serializer, leaf.deserializer);
            }
            Arc::new(table)
        };
        let factory = SerializerFactory::with_table(table);
        for space in self.spaces {
            factory.load_type_space(space);
        }
        factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrimitiveKind, TypeInfo, builtin};
    use crate::value::ObjectRef;

    #[test]
    fn scalar_hits_bypass_the_cache() {
        let factory = SerializerFactory::new();
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        let a = factory.get_serializer(&int);
        let b = factory.get_serializer(&int);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.cached(), (0, 0));
    }

    #[test]
    fn reflective_codecs_are_cached_by_name() {
        let factory = SerializerFactory::new();
        let order = TypeInfo::class("app.Order").build();
        let reloaded = TypeInfo::class("app.Order").build();
        let a = factory.get_deserializer(&order);
        let b = factory.get_deserializer(&reloaded);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.cached(), (0, 1));
    }

    #[test]
    fn nullable_decodes_as_wrapped_type() {
        let factory = SerializerFactory::new();
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        let a = factory.get_deserializer(&TypeDescriptor::nullable(&int));
        let b = factory.get_deserializer(&int);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn wire_name_resolution_order() {
        let factory = SerializerFactory::new();
        assert!(factory.get_deserializer_by_name("").is_none());
        assert!(factory.get_deserializer_by_name("app.Nowhere").is_none());
        assert!(factory.get_deserializer_by_name("[app.Nowhere").is_none());

        let user = TypeInfo::class("app.User").build();
        factory.load_type_space(TypeSpace::new("app").with_type(user.clone()));
        let found = factory.get_deserializer_by_name("app.User");
        assert!(found.is_some_and(|d| d.own_type().ptr_eq(&user)));

        let users = factory.get_deserializer_by_name("[app.User");
        assert!(users.is_some_and(|d| d.own_type().name() == "[app.User"));
    }

    #[test]
    fn expected_type_overrides_unrelated_decoder() {
        let factory = SerializerFactory::new();
        let shape = TypeInfo::class("app.Shape").build();
        let circle = TypeInfo::class("app.Circle").base(shape.clone()).build();
        let other = TypeInfo::class("app.Other").build();
        factory.load_type_space(TypeSpace::new("app").with_type(circle.clone()));

        let kept = factory.get_object_deserializer("app.Circle", Some(&shape));
        assert!(kept.own_type().ptr_eq(&circle));

        let replaced = factory.get_object_deserializer("app.Circle", Some(&other));
        assert!(replaced.own_type().ptr_eq(&other));

        let fallback = factory.get_object_deserializer("app.Missing", None);
        assert!(fallback.own_type().ptr_eq(&builtin::generic_map()));
    }

    #[test]
    fn read_resolve_decoder_is_kept() {
        let factory = SerializerFactory::new();
        let token = TypeInfo::class("app.Token")
            .read_resolve(Arc::new(|_: &ObjectRef| -> Option<ObjectRef> { None }))
            .build();
        let other = TypeInfo::class("app.Other").build();
        factory.load_type_space(TypeSpace::new("app").with_type(token.clone()));
        let kept = factory.get_object_deserializer("app.Token", Some(&other));
        assert!(kept.own_type().ptr_eq(&token));
        assert!(kept.is_read_resolve());

        let list = factory.get_list_deserializer("app.Token", Some(&other));
        assert!(list.own_type().ptr_eq(&other));
    }

    #[test]
    fn builder_registers_leaves_first_wins() {
        let money = TypeInfo::class("app.Money").build();
        let factory = SerializerFactory::builder()
            .platform_types(false)
            .leaf(
                money.clone(),
                "money",
                Arc::new(crate::codec::ValueObjectSerializer::new("money")),
                Arc::new(crate::codec::ValueObjectDeserializer::new(money.clone())),
            )
            .build();
        assert!(factory.get_deserializer_by_name("money").is_some());
        assert!(factory.get_deserializer_by_name("decimal").is_none());
        assert!(factory.primitives().entry(&money).is_some());
    }
}
