use crate::query::models::Limit;
use crate::schema::classify::{
    classify, default_field_names, is_standard_field, secret_field_name, FieldCategory,
    StructureFlags, ENUM_FIELD_PREFIX,
};
use crate::schema::index::SchemaIndex;
use crate::schema::models::TypeDescriptor;
use crate::Result;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use std::collections::HashSet;

/// One `q/select` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectEntry {
    /// Scalar projection: `"field"`.
    Field(String),
    /// Single related object: `{"field": [sub-fields]}`.
    Nested { field: String, select: Vec<String> },
    /// Related collection: `{"field": {"q/select": [...], "q/limit": "q/no-limit"}}`.
    Collection { field: String, select: Vec<String> },
}

impl SelectEntry {
    pub fn field_name(&self) -> &str {
        match self {
            SelectEntry::Field(field)
            | SelectEntry::Nested { field, .. }
            | SelectEntry::Collection { field, .. } => field,
        }
    }

    /// Sub-field names for nested entries; empty for scalar ones.
    pub fn sub_fields(&self) -> &[String] {
        match self {
            SelectEntry::Field(_) => &[],
            SelectEntry::Nested { select, .. } | SelectEntry::Collection { select, .. } => select,
        }
    }
}

#[derive(Serialize)]
struct CollectionSelect<'a> {
    #[serde(rename = "q/select")]
    select: &'a [String],
    #[serde(rename = "q/limit")]
    limit: Limit,
}

impl Serialize for SelectEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SelectEntry::Field(field) => serializer.serialize_str(field),
            SelectEntry::Nested { field, select } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(field, select)?;
                map.end()
            }
            SelectEntry::Collection { field, select } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    field,
                    &CollectionSelect {
                        select,
                        limit: Limit::Unbounded,
                    },
                )?;
                map.end()
            }
        }
    }
}

/// Ordered select list with at most one entry per field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectSpec {
    entries: Vec<SelectEntry>,
}

impl SelectSpec {
    /// Append `entry` unless an entry for the same field name exists. Returns whether it was added.
    pub fn push(&mut self, entry: SelectEntry) -> bool {
        if self.contains(entry.field_name()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|e| e.field_name() == field)
    }

    pub fn get(&self, field: &str) -> Option<&SelectEntry> {
        self.entries.iter().find(|e| e.field_name() == field)
    }

    pub fn entries(&self) -> &[SelectEntry] {
        &self.entries
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(SelectEntry::field_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SelectSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for entry in &self.entries {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

fn unique(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// Sub-fields contributed by each structured flag, unioned in flag order.
///
/// Relations contribute only the related type's default fields. This is a hard
/// stop: schemas contain circular relations (task -> assignee -> tasks).
fn sub_field_names(
    type_name: &str,
    value_type: &TypeDescriptor,
    flags: StructureFlags,
) -> Vec<String> {
    let mut names = Vec::new();
    if flags.file {
        names.extend(value_type.field_names().map(str::to_string));
    }
    if flags.enumeration {
        names.extend(
            value_type
                .field_names()
                .filter(|n| n.starts_with(ENUM_FIELD_PREFIX))
                .map(str::to_string),
        );
    }
    if flags.relation {
        names.extend(default_field_names(value_type));
    }
    if flags.complex {
        names.push(secret_field_name(type_name));
    }
    unique(names)
}

/// Build the select list for `root`.
///
/// Default fields come first, then every requested or standard field in schema
/// order. Reference fields and structured fields with nothing to expand are left out.
#[tracing::instrument(level = "debug", skip(index, root, requested), fields(root = %root.name))]
pub fn expand(
    index: &SchemaIndex,
    root: &TypeDescriptor,
    requested: &HashSet<String>,
) -> Result<SelectSpec> {
    let mut spec = SelectSpec::default();
    for name in default_field_names(root) {
        spec.push(SelectEntry::Field(name));
    }

    for field in root
        .fields
        .iter()
        .filter(|f| requested.contains(&f.name) || is_standard_field(&f.name))
    {
        let value_type = index.require(&field.value_type)?;
        let category = classify(field, value_type);
        if category == FieldCategory::Primitive {
            spec.push(SelectEntry::Field(field.name.clone()));
            continue;
        }
        let Some(flags) = category.structure() else {
            tracing::trace!(field = %field.name, "reference field skipped");
            continue;
        };

        let select = sub_field_names(&field.value_type, value_type, flags);
        if select.is_empty() {
            tracing::debug!(
                field = %field.name,
                value_type = %field.value_type,
                "no expansion available"
            );
            continue;
        }
        let entry = if flags.collection {
            SelectEntry::Collection {
                field: field.name.clone(),
                select,
            }
        } else {
            SelectEntry::Nested {
                field: field.name.clone(),
                select,
            }
        };
        spec.push(entry);
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::models::Meta;
    use crate::test_support::{field, workspace_index};
    use crate::Error;
    use serde_json::json;

    fn requested(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn expand_task(names: &[&str]) -> SelectSpec {
        let index = workspace_index();
        let root = index.require("Tasks/Task").unwrap();
        expand(&index, root, &requested(names)).unwrap()
    }

    fn assert_no_duplicates(spec: &SelectSpec) {
        let mut seen = HashSet::new();
        for entry in spec.entries() {
            assert!(seen.insert(entry.field_name()), "duplicate {}", entry.field_name());
            let mut sub_seen = HashSet::new();
            for sub in entry.sub_fields() {
                assert!(sub_seen.insert(sub), "duplicate sub-field {sub}");
            }
        }
    }

    #[test]
    fn no_requested_fields_yields_defaults() {
        let spec = expand_task(&[]);
        let names: Vec<_> = spec.field_names().collect();
        assert_eq!(
            names,
            vec![
                "fibery/id",
                "fibery/public-id",
                "fibery/creation-date",
                "Tasks/Name",
                "Tasks/Link",
            ]
        );
        assert!(spec.entries().iter().all(|e| matches!(e, SelectEntry::Field(_))));
    }

    #[test]
    fn task_with_assignee_and_tags() {
        let spec = expand_task(&["Tasks/Assignee", "Tasks/Tags"]);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!([
                "fibery/id",
                "fibery/public-id",
                "fibery/creation-date",
                "Tasks/Name",
                "Tasks/Link",
                {"Tasks/Assignee": ["fibery/id", "fibery/public-id", "user/name"]},
                {"Tasks/Tags": {"q/select": ["enum/name", "enum/icon"], "q/limit": "q/no-limit"}}
            ])
        );
    }

    #[test]
    fn every_field_requested_has_no_duplicates() {
        let index = workspace_index();
        let root = index.require("Tasks/Task").unwrap();
        let all: Vec<&str> = root.field_names().collect();
        let spec = expand(&index, root, &requested(&all)).unwrap();
        assert_no_duplicates(&spec);
        // Requested primitives land after the defaults.
        assert!(spec.contains("fibery/modification-date"));
    }

    #[test]
    fn reference_fields_never_appear() {
        let spec = expand_task(&["Tasks/References"]);
        assert!(!spec.contains("Tasks/References"));
    }

    #[test]
    fn structured_without_expansion_is_dropped() {
        let spec = expand_task(&["Tasks/Blob"]);
        assert!(!spec.contains("Tasks/Blob"));
    }

    #[test]
    fn files_expand_all_fields_once_as_collection() {
        let spec = expand_task(&["Tasks/Files"]);
        assert_eq!(
            spec.get("Tasks/Files"),
            Some(&SelectEntry::Collection {
                field: "Tasks/Files".to_string(),
                select: vec![
                    "fibery/id".to_string(),
                    "fibery/name".to_string(),
                    "fibery/content-type".to_string(),
                    "fibery/secret".to_string(),
                ],
            })
        );
    }

    #[test]
    fn documents_get_the_secret_pseudo_field() {
        let spec = expand_task(&["Tasks/Description"]);
        assert_eq!(
            spec.get("Tasks/Description"),
            Some(&SelectEntry::Nested {
                field: "Tasks/Description".to_string(),
                select: vec!["Collaboration~Documents/secret".to_string()],
            })
        );
    }

    #[test]
    fn self_relation_stops_at_default_fields() {
        let spec = expand_task(&["Tasks/Subtasks"]);
        let Some(SelectEntry::Collection { select, .. }) = spec.get("Tasks/Subtasks") else {
            panic!("expected collection entry");
        };
        assert_eq!(
            select,
            &vec![
                "fibery/id".to_string(),
                "fibery/public-id".to_string(),
                "fibery/creation-date".to_string(),
                "Tasks/Name".to_string(),
                "Tasks/Link".to_string(),
            ]
        );
    }

    #[test]
    fn primitive_complex_type_stays_bare() {
        let mut types = crate::test_support::workspace_types();
        for ty in types.iter_mut() {
            if ty.name == "fibery/file" {
                ty.meta = crate::test_support::meta(json!({"fibery/primitive?": true}));
            }
        }
        let index = SchemaIndex::new(types);
        let root = index.require("Tasks/Task").unwrap();
        let spec = expand(&index, root, &requested(&["Tasks/Files"])).unwrap();
        assert_eq!(
            spec.get("Tasks/Files"),
            Some(&SelectEntry::Field("Tasks/Files".to_string()))
        );
    }

    #[test]
    fn unknown_value_type_fails_fast() {
        let index = workspace_index();
        let root = TypeDescriptor::new(
            "Tasks/Broken",
            "type-broken",
            vec![field("b-1", "Tasks/Ghost", "Ghosts/Ghost", json!({}))],
            Meta::new(),
        );
        let err = expand(&index, &root, &requested(&["Tasks/Ghost"])).unwrap_err();
        assert!(matches!(err, Error::TypeNotFound(ref k) if k == "Ghosts/Ghost"));
    }

    #[test]
    fn push_keeps_first_entry_per_field() {
        let mut spec = SelectSpec::default();
        assert!(spec.push(SelectEntry::Field("a/b".to_string())));
        assert!(!spec.push(SelectEntry::Nested {
            field: "a/b".to_string(),
            select: vec!["x/y".to_string()],
        }));
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.get("a/b"), Some(&SelectEntry::Field("a/b".to_string())));
    }
}
