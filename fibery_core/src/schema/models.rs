use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata mapping attached to types and fields (`fibery/meta`).
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Returns true if `key` is present in `meta` with a truthy value.
///
/// Fibery encodes some flags as booleans (`fibery/primitive?`) and others as ids
/// (`fibery/relation` holds the relation id), so presence-with-content counts.
pub fn meta_flag(meta: &Meta, key: &str) -> bool {
    match meta.get(key) {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Some(serde_json::Value::Array(_)) | Some(serde_json::Value::Object(_)) => true,
    }
}

/// A single field on a type, as returned by the schema endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "fibery/name")]
    pub name: String,
    #[serde(rename = "fibery/id", default)]
    pub id: String,
    /// Name of the value type; resolved through the schema index.
    #[serde(rename = "fibery/type")]
    pub value_type: String,
    #[serde(rename = "fibery/meta", default)]
    pub meta: Meta,
}

impl FieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        value_type: impl Into<String>,
        meta: Meta,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            value_type: value_type.into(),
            meta,
        }
    }

    pub fn is_collection(&self) -> bool {
        meta_flag(&self.meta, "fibery/collection?")
    }

    pub fn is_relation(&self) -> bool {
        meta_flag(&self.meta, "fibery/relation")
    }

    pub fn is_title(&self) -> bool {
        meta_flag(&self.meta, "ui/title?")
    }
}

/// A type in the workspace schema (databases, enums, primitives, built-ins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(rename = "fibery/name")]
    pub name: String,
    #[serde(rename = "fibery/id", default)]
    pub id: String,
    #[serde(rename = "fibery/fields", default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(rename = "fibery/meta", default)]
    pub meta: Meta,
}

impl TypeDescriptor {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        meta: Meta,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            fields,
            meta,
        }
    }

    pub fn is_primitive(&self) -> bool {
        meta_flag(&self.meta, "fibery/primitive?")
    }

    pub fn is_enum(&self) -> bool {
        meta_flag(&self.meta, "fibery/enum?")
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_id(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| !f.id.is_empty() && f.id == id)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Schema payload as delivered by a schema source or a dump on disk.
///
/// The remote API returns a sequence; already-indexed payloads arrive as a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSchema {
    Types(Vec<TypeDescriptor>),
    Indexed(BTreeMap<String, TypeDescriptor>),
}

impl RawSchema {
    pub fn into_types(self) -> Vec<TypeDescriptor> {
        match self {
            RawSchema::Types(types) => types,
            RawSchema::Indexed(map) => map.into_values().collect(),
        }
    }
}

impl From<Vec<TypeDescriptor>> for RawSchema {
    fn from(types: Vec<TypeDescriptor>) -> Self {
        RawSchema::Types(types)
    }
}
