//! Loaded type spaces: the name -> type lookup used when decoding a class name the
//! codec table does not know.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::descriptor::TypeDescriptor;

/// A named collection of types, analogous to one loaded module or library.
#[derive(Debug, Default)]
pub struct TypeSpace {
    name: String,
    types: HashMap<String, TypeDescriptor>,
}

impl TypeSpace {
    /// Creates an empty type space.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: HashMap::new(),
        }
    }

    /// Adds a type, builder style.
    #[must_use]
    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.insert(ty);
        self
    }

    /// Adds a type. A later type with the same full name replaces the earlier one.
    pub fn insert(&mut self, ty: TypeDescriptor) {
        self.types.insert(ty.name().to_owned(), ty);
    }

    /// Looks up a type by full name.
    pub fn find(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// The space's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the space holds no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// The ordered set of loaded type spaces.
///
/// Readers take a lock-free snapshot; loading a space publishes a new snapshot.
#[derive(Debug, Default)]
pub struct TypeSpaces {
    spaces: ArcSwap<Vec<Arc<TypeSpace>>>,
}

impl TypeSpaces {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a space. Search order is load order.
    pub fn load(&self, space: TypeSpace) {
        let space = Arc::new(space);
        log::debug!(
            "[TypeSpaces::load] '{}' ({} types)",
            space.name(),
            space.len()
        );
        self.spaces.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(space.clone());
            next
        });
    }

    /// Finds the first type with the given full name, searching spaces in load order.
    pub fn find(&self, name: &str) -> Option<TypeDescriptor> {
        let snapshot = self.spaces.load();
        let found = snapshot
            .iter()
            .find_map(|space| space.find(name).map(|ty| (space.name().to_owned(), ty.clone())));
        match found {
            Some((space, ty)) => {
                log::trace!("[TypeSpaces::find] '{name}' found in '{space}'");
                Some(ty)
            }
            None => {
                log::trace!("[TypeSpaces::find] '{name}' not found in {} spaces", snapshot.len());
                None
            }
        }
    }

    /// Number of loaded spaces.
    pub fn len(&self) -> usize {
        self.spaces.load().len()
    }

    /// Returns true if no space is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
