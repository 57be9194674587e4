//! Per-stream reference and class-definition tables.
//!
//! Both sides assign indices in strict first-encounter order, so the encoder's index
//! for an instance is the decoder's index for the object built from the same bytes.
//! The tables belong to one writer or reader and are cleared between top-level graphs.

use std::collections::HashMap;

use crate::error::{HessianError, Result};
use crate::format::ClassDefinition;
use crate::value::ObjectRef;

/// Encode side: identity -> index for instances already written.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    ids: HashMap<usize, u32>,
    // Keeps every registered instance alive so its address cannot be reused mid-stream.
    pinned: Vec<ObjectRef>,
}

impl ReferenceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the earlier index of `obj`, or registers it at the next index and
    /// returns `None`.
    pub fn lookup_or_insert(&mut self, obj: &ObjectRef) -> Option<u32> {
        if let Some(index) = self.ids.get(&obj.addr()) {
            return Some(*index);
        }
        let index = u32::try_from(self.pinned.len()).unwrap_or(u32::MAX);
        self.ids.insert(obj.addr(), index);
        self.pinned.push(obj.clone());
        None
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.pinned.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.pinned.clear();
    }
}

/// Encode side: class name -> definition index.
#[derive(Debug, Default)]
pub struct ClassDefinitionTable {
    by_name: HashMap<String, u32>,
}

impl ClassDefinitionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of an already emitted definition.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// Registers a definition at the next index.
    pub fn insert(&mut self, name: &str) -> u32 {
        let index = u32::try_from(self.by_name.len()).unwrap_or(u32::MAX);
        self.by_name.insert(name.to_owned(), index);
        index
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if no definition was emitted.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

/// Decode side: instances in registration order.
#[derive(Debug, Default)]
pub struct InstanceTable {
    instances: Vec<ObjectRef>,
}

impl InstanceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instance at the next implicit index.
    pub fn register(&mut self, obj: ObjectRef) -> u32 {
        let index = u32::try_from(self.instances.len()).unwrap_or(u32::MAX);
        self.instances.push(obj);
        index
    }

    /// The instance registered at `index`, shared (not copied).
    pub fn resolve(&self, index: u32) -> Result<ObjectRef> {
        self.instances
            .get(index as usize)
            .cloned()
            .ok_or(HessianError::DanglingReference {
                index,
                len: self.instances.len(),
            })
    }

    /// Substitutes the instance at `index` (read-resolve).
    pub fn replace(&mut self, index: u32, obj: ObjectRef) -> Result<()> {
        let len = self.instances.len();
        let slot = self
            .instances
            .get_mut(index as usize)
            .ok_or(HessianError::DanglingReference { index, len })?;
        *slot = obj;
        Ok(())
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

/// Decode side: class definitions in stream order.
#[derive(Debug, Default)]
pub struct ClassTable {
    definitions: Vec<ClassDefinition>,
}

impl ClassTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a definition.
    ///
    /// A class name may be defined once per stream; a second definition with a
    /// different field list is a schema mismatch.
    pub fn define(&mut self, def: ClassDefinition) -> Result<u32> {
        if let Some(existing) = self.definitions.iter().find(|d| d.name == def.name)
            && existing.fields != def.fields
        {
            return Err(HessianError::SchemaMismatch {
                class: def.name,
                expected: existing.fields.clone(),
                found: def.fields,
            });
        }
        let index = u32::try_from(self.definitions.len()).unwrap_or(u32::MAX);
        self.definitions.push(def);
        Ok(index)
    }

    /// The definition at `index`.
    pub fn get(&self, index: u32) -> Result<&ClassDefinition> {
        self.definitions.get(index as usize).ok_or_else(|| {
            HessianError::Protocol(format!(
                "object refers to class definition #{index} but only {} are defined",
                self.definitions.len()
            ))
        })
    }

    /// All definitions.
    pub fn definitions(&self) -> &[ClassDefinition] {
        &self.definitions
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.definitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use crate::types::TypeInfo;

    fn instance() -> ObjectRef {
        let ty = TypeInfo::class("T").build();
        match Value::object(ty, Vec::<(String, Value)>::new()) {
            Value::Ref(obj) => obj,
            _ => unreachable!(),
        }
    }

    #[test]
    fn encode_indices_follow_first_encounter() {
        let (a, b) = (instance(), instance());
        let mut table = ReferenceTable::new();
        assert_eq!(table.lookup_or_insert(&a), None);
        assert_eq!(table.lookup_or_insert(&b), None);
        assert_eq!(table.lookup_or_insert(&a), Some(0));
        assert_eq!(table.lookup_or_insert(&b), Some(1));
        table.clear();
        assert_eq!(table.lookup_or_insert(&b), None);
    }

    #[test]
    fn decode_rejects_forward_references() {
        let mut table = InstanceTable::new();
        let a = instance();
        assert_eq!(table.register(a.clone()), 0);
        assert!(table.resolve(0).is_ok_and(|got| got.ptr_eq(&a)));
        assert!(matches!(
            table.resolve(1),
            Err(HessianError::DanglingReference { index: 1, len: 1 })
        ));
    }

    #[test]
    fn redefinition_must_match() {
        let mut classes = ClassTable::new();
        let def = ClassDefinition::new("P", vec!["x".into(), "y".into()]);
        assert_eq!(classes.define(def.clone()).ok(), Some(0));
        assert_eq!(classes.define(def).ok(), Some(1));
        let short = ClassDefinition::new("P", vec!["x".into()]);
        assert!(matches!(
            classes.define(short),
            Err(HessianError::SchemaMismatch { .. })
        ));
        assert!(classes.get(5).is_err());
    }
}
