//! Option lists for the source configuration UI: which entity types and which of
//! their fields a user can pick.

use crate::schema::classify::{is_standard_field, COMPLEX_TYPES};
use crate::schema::index::{is_hidden_type, SchemaIndex};
use crate::schema::models::FieldDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields never offered, even though they live under `fibery/`.
pub const INVALID_FIELD_NAMES: &[&str] = &["fibery/id", "fibery/rank", "fibery/public-id"];

/// Fields always offered regardless of their flags.
pub const VALID_FIELD_NAMES: &[&str] = &["workflow/state", "Files/Files"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerOption {
    pub value: String,
    pub label: String,
}

fn has_complex_value_type(field: &FieldDescriptor) -> bool {
    COMPLEX_TYPES.contains(&field.value_type.as_str())
}

/// Fields that can be selected directly on the entity.
pub fn simple_fields(fields: &[FieldDescriptor]) -> Vec<&FieldDescriptor> {
    fields
        .iter()
        .filter(|f| {
            !is_hidden_type(&f.value_type)
                && !INVALID_FIELD_NAMES.contains(&f.name.as_str())
                && (VALID_FIELD_NAMES.contains(&f.name.as_str())
                    || f.name.starts_with("fibery/")
                    || f.is_collection()
                    || f.is_relation()
                    || has_complex_value_type(f))
        })
        .collect()
}

/// Non-relation built-in and complex fields beyond the standard identity set.
pub fn related_fields(fields: &[FieldDescriptor]) -> Vec<&FieldDescriptor> {
    fields
        .iter()
        .filter(|f| {
            !f.is_relation()
                && !is_standard_field(&f.name)
                && (f.name.starts_with("fibery/") || has_complex_value_type(f))
        })
        .collect()
}

/// Selectable entity types, hidden types excluded, unique and sorted by label.
#[tracing::instrument(level = "debug", skip_all)]
pub fn type_options(index: &SchemaIndex) -> Vec<PickerOption> {
    let names: std::collections::BTreeSet<&str> =
        index.visible_types().map(|t| t.name.as_str()).collect();
    names
        .into_iter()
        .map(|name| PickerOption {
            value: name.to_string(),
            label: name.to_string(),
        })
        .collect()
}

/// Selectable fields of a type as `{value: field id, label: field name}`, sorted by label.
///
/// An unknown type yields an empty list.
#[tracing::instrument(level = "debug", skip(index))]
pub fn field_options(index: &SchemaIndex, type_name_or_id: &str) -> Vec<PickerOption> {
    let Some(ty) = index.lookup(type_name_or_id) else {
        tracing::error!(type_key = %type_name_or_id, "type not found");
        return Vec::new();
    };

    let mut by_name: BTreeMap<&str, &FieldDescriptor> = BTreeMap::new();
    for f in simple_fields(&ty.fields)
        .into_iter()
        .chain(related_fields(&ty.fields))
    {
        by_name.entry(f.name.as_str()).or_insert(f);
    }

    by_name
        .into_values()
        .map(|f| PickerOption {
            value: f.id.clone(),
            label: f.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::models::{Meta, TypeDescriptor};
    use serde_json::json;

    fn field(name: &str, ty: &str, m: serde_json::Value) -> FieldDescriptor {
        FieldDescriptor::new(
            name,
            format!("id:{name}"),
            ty,
            m.as_object().cloned().unwrap_or_default(),
        )
    }

    fn task_type() -> TypeDescriptor {
        TypeDescriptor::new(
            "Tasks/Task",
            "t",
            vec![
                field("fibery/id", "fibery/uuid", json!({})),
                field("fibery/public-id", "fibery/text", json!({})),
                field("fibery/rank", "fibery/decimal", json!({})),
                field("fibery/creation-date", "fibery/date-time", json!({})),
                field("fibery/modification-date", "fibery/date-time", json!({})),
                field("Tasks/Name", "fibery/text", json!({"ui/title?": true})),
                field("Tasks/Assignee", "fibery/user", json!({"fibery/relation": "r1"})),
                field("Tasks/Tags", "Tasks/Tag", json!({"fibery/collection?": true})),
                field("Tasks/Description", "Collaboration~Documents/Document", json!({})),
                field(
                    "Tasks/Refs",
                    "Collaboration~Documents/Reference",
                    json!({"fibery/collection?": true}),
                ),
                field("workflow/state", "workflow/state_Tasks/Task", json!({})),
                field("Files/Files", "fibery/file", json!({"fibery/collection?": true})),
            ],
            Meta::new(),
        )
    }

    fn names(fields: Vec<&FieldDescriptor>) -> Vec<&str> {
        fields.into_iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn simple_fields_filter() {
        let ty = task_type();
        assert_eq!(
            names(simple_fields(&ty.fields)),
            vec![
                "fibery/creation-date",
                "fibery/modification-date",
                "Tasks/Assignee",
                "Tasks/Tags",
                "Tasks/Description",
                "workflow/state",
                "Files/Files",
            ]
        );
    }

    #[test]
    fn related_fields_filter() {
        let ty = task_type();
        assert_eq!(
            names(related_fields(&ty.fields)),
            vec![
                "fibery/rank",
                "fibery/modification-date",
                "Tasks/Description",
                "Files/Files",
            ]
        );
    }

    #[test]
    fn field_options_are_unique_and_sorted() {
        let index = SchemaIndex::new(vec![task_type()]);
        let labels: Vec<String> = field_options(&index, "t")
            .into_iter()
            .map(|o| o.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Files/Files",
                "Tasks/Assignee",
                "Tasks/Description",
                "Tasks/Tags",
                "fibery/creation-date",
                "fibery/modification-date",
                "fibery/rank",
                "workflow/state",
            ]
        );
        let assignee = field_options(&index, "Tasks/Task")
            .into_iter()
            .find(|o| o.label == "Tasks/Assignee")
            .unwrap();
        assert_eq!(assignee.value, "id:Tasks/Assignee");
    }

    #[test]
    fn unknown_type_has_no_field_options() {
        let index = SchemaIndex::new(vec![]);
        assert!(field_options(&index, "Nope/Nope").is_empty());
    }

    #[test]
    fn type_options_skip_hidden_types() {
        let index = SchemaIndex::new(vec![
            TypeDescriptor::new("Tasks/Task", "t", vec![], Meta::new()),
            TypeDescriptor::new("Collaboration~Documents/Reference", "r", vec![], Meta::new()),
            TypeDescriptor::new("Bugs/Bug", "b", vec![], Meta::new()),
        ]);
        let labels: Vec<String> = type_options(&index).into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["Bugs/Bug", "Tasks/Task"]);
    }
}
