//! Field classification: reads the schema's flag mappings once and turns them into
//! a `FieldCategory` that the select expander branches on.

use crate::schema::models::{FieldDescriptor, TypeDescriptor};

/// Built-in file attachment type.
pub const FILE_TYPE: &str = "fibery/file";

/// Built-in URL primitive; fields of this type are always selected.
pub const URL_TYPE: &str = "fibery/url";

/// Rich-text document type (matched by prefix).
pub const DOCUMENT_TYPE: &str = "Collaboration~Documents/Document";

/// Value types that need the `<namespace>/secret` pseudo-field instead of plain expansion.
pub const COMPLEX_TYPES: &[&str] = &[FILE_TYPE, DOCUMENT_TYPE];

/// Identity fields selected on every type.
pub const STANDARD_FIELDS: &[&str] = &[
    "fibery/id",
    "fibery/public-id",
    "fibery/creation-date",
    "fibery/url",
    "fibery/type",
];

/// Value types ending with this suffix are references and never selected.
pub const REFERENCE_SUFFIX: &str = "/Reference";

/// Enum value types expose their selectable fields under this prefix.
pub const ENUM_FIELD_PREFIX: &str = "enum/";

/// Suffix of the pseudo-field synthesized for complex types.
pub const SECRET_SUFFIX: &str = "/secret";

pub fn is_standard_field(name: &str) -> bool {
    STANDARD_FIELDS.contains(&name)
}

pub fn is_complex_type(type_name: &str) -> bool {
    COMPLEX_TYPES
        .iter()
        .any(|t| type_name == *t || type_name.starts_with(t))
}

/// Whether a field belongs to the default selection of its type.
pub fn is_default_field(field: &FieldDescriptor) -> bool {
    field.value_type == URL_TYPE || field.is_title() || is_standard_field(&field.name)
}

/// Names of the fields selected on `ty` regardless of what was requested.
pub fn default_field_names(ty: &TypeDescriptor) -> Vec<String> {
    ty.fields
        .iter()
        .filter(|f| is_default_field(f))
        .map(|f| f.name.clone())
        .collect()
}

/// The `<namespace>/secret` pseudo-field for a complex value type.
///
/// Only meaningful for `COMPLEX_TYPES`; the namespace is the part before the first `/`.
pub fn secret_field_name(type_name: &str) -> String {
    let namespace = type_name.split('/').next().unwrap_or(type_name);
    format!("{namespace}{SECRET_SUFFIX}")
}

/// Flags of a structured (non-primitive, non-reference) field.
///
/// Each flag contributes its own sub-fields independently; `collection` only
/// decides the nesting shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureFlags {
    pub file: bool,
    pub enumeration: bool,
    pub relation: bool,
    pub complex: bool,
    pub collection: bool,
}

impl StructureFlags {
    /// True if at least one flag can contribute sub-fields.
    pub fn expandable(&self) -> bool {
        self.file || self.enumeration || self.relation || self.complex
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    /// Scalar value; selected as a bare name.
    Primitive,
    /// `.../Reference` value type; never selected.
    Reference,
    File(StructureFlags),
    RichDocument(StructureFlags),
    Enum(StructureFlags),
    Relation(StructureFlags),
    /// Structured value with nothing to expand; dropped from the select.
    Opaque(StructureFlags),
}

impl FieldCategory {
    pub fn structure(&self) -> Option<StructureFlags> {
        match self {
            FieldCategory::Primitive | FieldCategory::Reference => None,
            FieldCategory::File(f)
            | FieldCategory::RichDocument(f)
            | FieldCategory::Enum(f)
            | FieldCategory::Relation(f)
            | FieldCategory::Opaque(f) => Some(*f),
        }
    }
}

/// Classify `field` given its resolved value type.
///
/// Precedence: primitive, then reference, then the structured variants
/// (file, rich document, enum, relation, opaque).
pub fn classify(field: &FieldDescriptor, value_type: &TypeDescriptor) -> FieldCategory {
    if value_type.is_primitive() {
        return FieldCategory::Primitive;
    }
    let type_name = field.value_type.as_str();
    if type_name.ends_with(REFERENCE_SUFFIX) {
        return FieldCategory::Reference;
    }

    let flags = StructureFlags {
        file: type_name == FILE_TYPE,
        enumeration: value_type.is_enum(),
        relation: field.is_relation(),
        complex: is_complex_type(type_name),
        collection: field.is_collection(),
    };

    if flags.file {
        FieldCategory::File(flags)
    } else if flags.complex {
        FieldCategory::RichDocument(flags)
    } else if flags.enumeration {
        FieldCategory::Enum(flags)
    } else if flags.relation {
        FieldCategory::Relation(flags)
    } else {
        FieldCategory::Opaque(flags)
    }
}
