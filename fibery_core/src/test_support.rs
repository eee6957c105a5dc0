#![cfg(test)]

use crate::schema::index::SchemaIndex;
use crate::schema::models::{FieldDescriptor, Meta, TypeDescriptor};
use serde_json::json;

pub(crate) fn meta(value: serde_json::Value) -> Meta {
    value.as_object().cloned().unwrap_or_default()
}

pub(crate) fn field(
    id: &str,
    name: &str,
    value_type: &str,
    m: serde_json::Value,
) -> FieldDescriptor {
    FieldDescriptor::new(name, id, value_type, meta(m))
}

fn primitive(name: &str) -> TypeDescriptor {
    TypeDescriptor::new(
        name,
        format!("type:{name}"),
        vec![],
        meta(json!({"fibery/primitive?": true})),
    )
}

/// A small workspace: a `Tasks/Task` database with one field of every shape, a
/// user type relating back to tasks, an enum, and the built-in complex types.
pub(crate) fn workspace_types() -> Vec<TypeDescriptor> {
    vec![
        primitive("fibery/uuid"),
        primitive("fibery/text"),
        primitive("fibery/date-time"),
        primitive("fibery/url"),
        primitive("fibery/decimal"),
        TypeDescriptor::new(
            "fibery/user",
            "type-user",
            vec![
                field("u-id", "fibery/id", "fibery/uuid", json!({})),
                field("u-public-id", "fibery/public-id", "fibery/text", json!({})),
                field("u-name", "user/name", "fibery/text", json!({"ui/title?": true})),
                field("u-email", "user/email", "fibery/text", json!({})),
                field(
                    "u-tasks",
                    "user/Tasks",
                    "Tasks/Task",
                    json!({"fibery/relation": "rel-assignee", "fibery/collection?": true}),
                ),
            ],
            Meta::new(),
        ),
        TypeDescriptor::new(
            "Tasks/Tag",
            "type-tag",
            vec![
                field("tag-id", "fibery/id", "fibery/uuid", json!({})),
                field("tag-name", "enum/name", "fibery/text", json!({"ui/title?": true})),
                field("tag-icon", "enum/icon", "fibery/text", json!({})),
                field("tag-rank", "fibery/rank", "fibery/decimal", json!({})),
            ],
            meta(json!({"fibery/enum?": true})),
        ),
        TypeDescriptor::new(
            "fibery/file",
            "type-file",
            vec![
                field("file-id", "fibery/id", "fibery/uuid", json!({})),
                field("file-name", "fibery/name", "fibery/text", json!({})),
                field("file-content-type", "fibery/content-type", "fibery/text", json!({})),
                field("file-secret", "fibery/secret", "fibery/text", json!({})),
            ],
            Meta::new(),
        ),
        TypeDescriptor::new(
            "Collaboration~Documents/Document",
            "type-document",
            vec![
                field("doc-id", "fibery/id", "fibery/uuid", json!({})),
                field("doc-secret", "Collaboration~Documents/secret", "fibery/text", json!({})),
            ],
            Meta::new(),
        ),
        TypeDescriptor::new(
            "Collaboration~Documents/Reference",
            "type-reference",
            vec![field("ref-id", "fibery/id", "fibery/uuid", json!({}))],
            Meta::new(),
        ),
        TypeDescriptor::new("Tasks/Blob", "type-blob", vec![], Meta::new()),
        TypeDescriptor::new(
            "Tasks/Task",
            "type-task",
            vec![
                field("f-id", "fibery/id", "fibery/uuid", json!({})),
                field("f-public-id", "fibery/public-id", "fibery/text", json!({})),
                field("f-created", "fibery/creation-date", "fibery/date-time", json!({})),
                field("f-modified", "fibery/modification-date", "fibery/date-time", json!({})),
                field("f-name", "Tasks/Name", "fibery/text", json!({"ui/title?": true})),
                field(
                    "f-assignee",
                    "Tasks/Assignee",
                    "fibery/user",
                    json!({"fibery/relation": "rel-assignee"}),
                ),
                field("f-tags", "Tasks/Tags", "Tasks/Tag", json!({"fibery/collection?": true})),
                field("f-files", "Tasks/Files", "fibery/file", json!({"fibery/collection?": true})),
                field(
                    "f-description",
                    "Tasks/Description",
                    "Collaboration~Documents/Document",
                    json!({}),
                ),
                field(
                    "f-references",
                    "Tasks/References",
                    "Collaboration~Documents/Reference",
                    json!({"fibery/collection?": true}),
                ),
                field("f-link", "Tasks/Link", "fibery/url", json!({})),
                field("f-blob", "Tasks/Blob", "Tasks/Blob", json!({})),
                field(
                    "f-subtasks",
                    "Tasks/Subtasks",
                    "Tasks/Task",
                    json!({"fibery/relation": "rel-subtasks", "fibery/collection?": true}),
                ),
            ],
            Meta::new(),
        ),
    ]
}

pub(crate) fn workspace_index() -> SchemaIndex {
    SchemaIndex::new(workspace_types())
}
