use crate::schema::models::{RawSchema, TypeDescriptor};
use crate::{Error, Result};
use std::collections::HashMap;

/// Types kept out of the user-facing type picker.
///
/// They stay in the index: fields may still reference them as value types.
pub const HIDDEN_TYPES: &[&str] = &["Collaboration~Documents/Reference"];

pub fn is_hidden_type(name: &str) -> bool {
    HIDDEN_TYPES.contains(&name)
}

/// Lookup over the workspace schema keyed by type name and type id.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl SchemaIndex {
    /// Fold a sequence of type descriptors. The first descriptor wins on duplicate names.
    #[tracing::instrument(level = "debug", skip_all, fields(types = types.len()))]
    pub fn new(types: Vec<TypeDescriptor>) -> Self {
        let mut index = Self::default();
        for ty in types {
            if index.by_name.contains_key(&ty.name) {
                tracing::debug!(type_name = %ty.name, "duplicate type in schema; keeping first");
                continue;
            }
            let pos = index.types.len();
            index.by_name.insert(ty.name.clone(), pos);
            if !ty.id.is_empty() {
                index.by_id.entry(ty.id.clone()).or_insert(pos);
            }
            index.types.push(ty);
        }
        index
    }

    pub fn from_raw(raw: RawSchema) -> Self {
        Self::new(raw.into_types())
    }

    /// Look a type up by name, falling back to id.
    pub fn lookup(&self, key: &str) -> Option<&TypeDescriptor> {
        self.by_name
            .get(key)
            .or_else(|| self.by_id.get(key))
            .map(|&pos| &self.types[pos])
    }

    /// Like `lookup`, but fails with `TypeNotFound` naming the missing key.
    pub fn require(&self, key: &str) -> Result<&TypeDescriptor> {
        self.lookup(key).ok_or_else(|| Error::TypeNotFound(key.to_string()))
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    /// Types offered to users when picking an entity type.
    pub fn visible_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter().filter(|t| !is_hidden_type(&t.name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl From<RawSchema> for SchemaIndex {
    fn from(raw: RawSchema) -> Self {
        Self::from_raw(raw)
    }
}
