use crate::query::models::{
    FieldRef, Filter, Limit, OrderClause, Query, QueryObject, QueryOptions, CHECKPOINT_PARAM,
};
use crate::query::select::expand;
use crate::schema::index::SchemaIndex;
use crate::schema::models::TypeDescriptor;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};

/// Resolve a configured field reference to a field name on `ty`.
///
/// Names (anything containing `/`) pass through unchecked; ids must exist on the type.
pub fn resolve_field_ref(ty: &TypeDescriptor, field: &FieldRef) -> Result<String> {
    let name = match field {
        FieldRef::Key(key) if key.contains('/') => Some(key.clone()),
        FieldRef::Labeled { label, .. } => Some(label.clone()),
        FieldRef::Key(id) => ty.field_by_id(id).map(|f| f.name.clone()),
    };
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| Error::FieldResolutionEmpty(field.to_string()))
}

fn incremental_filter(fields: &[String]) -> Filter {
    let mut clauses: Vec<Filter> = fields
        .iter()
        .map(|field| Filter::GreaterThan {
            field: field.clone(),
            param: CHECKPOINT_PARAM.to_string(),
        })
        .collect();
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        Filter::Or(clauses)
    }
}

/// Assemble the query for `type_name_or_id`.
///
/// Incremental fetch (ordering plus `field > $lastMaxTimestamp`) is added only when
/// both incremental fields and a checkpoint value are given. With several fields the
/// filter is an OR of per-field comparisons, so ordering is per field only.
#[tracing::instrument(level = "debug", skip(index, options))]
pub fn assemble(
    index: &SchemaIndex,
    type_name_or_id: &str,
    options: &QueryOptions,
) -> Result<QueryObject> {
    let ty = index.require(type_name_or_id)?;

    let mut requested = HashSet::new();
    for field in &options.fields {
        match resolve_field_ref(ty, field) {
            Ok(name) => {
                requested.insert(name);
            }
            Err(e) => tracing::debug!(error = %e, type_name = %ty.name, "dropping field reference"),
        }
    }

    let select = expand(index, ty, &requested)?;
    let mut query = Query {
        from: ty.name.clone(),
        select,
        limit: Limit::from_option(options.limit),
        order_by: Vec::new(),
        filter: None,
    };
    let mut params = BTreeMap::new();

    let incremental = options
        .incremental_fields
        .as_deref()
        .filter(|fields| !fields.is_empty());
    if let (Some(fields), Some(checkpoint)) = (incremental, options.checkpoint.as_ref()) {
        params.insert(CHECKPOINT_PARAM.to_string(), checkpoint.clone());
        query.order_by = fields.iter().map(OrderClause::asc).collect();
        query.filter = Some(incremental_filter(fields));
    }

    Ok(QueryObject { query, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::workspace_index;
    use serde_json::json;

    fn options(fields: &[&str]) -> QueryOptions {
        QueryOptions {
            fields: fields.iter().map(|f| FieldRef::from(*f)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_type_is_type_not_found() {
        let index = workspace_index();
        let err = assemble(&index, "Nope/Nope", &options(&[])).unwrap_err();
        assert!(matches!(err, Error::TypeNotFound(ref k) if k == "Nope/Nope"));
    }

    #[test]
    fn resolves_by_type_id_and_field_id() {
        let index = workspace_index();
        let query = assemble(&index, "type-task", &options(&["f-assignee", "missing-id"])).unwrap();
        assert_eq!(query.from_type(), "Tasks/Task");
        assert!(query.select().contains("Tasks/Assignee"));
        assert!(!query.select().contains("missing-id"));
    }

    #[test]
    fn label_refs_resolve_to_names() {
        let index = workspace_index();
        let mut opts = options(&[]);
        opts.fields.push(FieldRef::Labeled {
            label: "Tasks/Tags".to_string(),
            value: Some("f-tags".to_string()),
        });
        opts.fields.push(FieldRef::Labeled {
            label: String::new(),
            value: None,
        });
        let query = assemble(&index, "Tasks/Task", &opts).unwrap();
        assert!(query.select().contains("Tasks/Tags"));
        // Defaults plus the tags entry; the empty label contributed nothing.
        assert_eq!(query.select().len(), 6);
        assert!(query.select().field_names().all(|name| !name.is_empty()));
    }

    #[test]
    fn names_pass_through_even_when_absent() {
        let task = workspace_index().require("Tasks/Task").unwrap().clone();
        assert_eq!(
            resolve_field_ref(&task, &FieldRef::from("Tasks/NotThere")).unwrap(),
            "Tasks/NotThere"
        );
        assert!(matches!(
            resolve_field_ref(&task, &FieldRef::from("nope")),
            Err(Error::FieldResolutionEmpty(_))
        ));
    }

    #[test]
    fn without_checkpoint_no_incremental_clauses() {
        let index = workspace_index();
        let mut opts = options(&[]);
        opts.incremental_fields = Some(vec!["fibery/creation-date".to_string()]);
        let query = assemble(&index, "Tasks/Task", &opts).unwrap();
        assert!(query.filter().is_none());
        assert!(query.order_by().is_empty());
        assert!(query.params().is_empty());
        assert_eq!(query.limit(), Limit::Unbounded);
    }

    #[test]
    fn single_incremental_field() {
        let index = workspace_index();
        let mut opts = options(&[]);
        opts.limit = Some(10);
        opts.incremental_fields = Some(vec!["fibery/creation-date".to_string()]);
        opts.checkpoint = Some(json!("2024-05-01T00:00:00Z"));
        let query = assemble(&index, "Tasks/Task", &opts).unwrap();

        assert_eq!(
            query.to_json().unwrap(),
            json!({
                "query": {
                    "q/from": "Tasks/Task",
                    "q/select": [
                        "fibery/id",
                        "fibery/public-id",
                        "fibery/creation-date",
                        "Tasks/Name",
                        "Tasks/Link"
                    ],
                    "q/limit": 10,
                    "q/order-by": [[["fibery/creation-date"], "q/asc"]],
                    "q/where": [">", ["fibery/creation-date"], "$lastMaxTimestamp"]
                },
                "params": {"$lastMaxTimestamp": "2024-05-01T00:00:00Z"}
            })
        );
    }

    #[test]
    fn several_incremental_fields_are_ored() {
        let index = workspace_index();
        let mut opts = options(&[]);
        opts.incremental_fields = Some(vec![
            "fibery/creation-date".to_string(),
            "fibery/modification-date".to_string(),
        ]);
        opts.checkpoint = Some(json!("2024-05-01T00:00:00Z"));
        let query = assemble(&index, "Tasks/Task", &opts).unwrap();

        assert_eq!(
            query.filter(),
            Some(&Filter::Or(vec![
                Filter::GreaterThan {
                    field: "fibery/creation-date".to_string(),
                    param: CHECKPOINT_PARAM.to_string(),
                },
                Filter::GreaterThan {
                    field: "fibery/modification-date".to_string(),
                    param: CHECKPOINT_PARAM.to_string(),
                },
            ]))
        );
        assert_eq!(query.order_by().len(), 2);
    }

    #[test]
    fn empty_incremental_list_is_ignored() {
        let index = workspace_index();
        let mut opts = options(&[]);
        opts.incremental_fields = Some(vec![]);
        opts.checkpoint = Some(json!("2024-05-01T00:00:00Z"));
        let query = assemble(&index, "Tasks/Task", &opts).unwrap();
        assert!(query.filter().is_none());
        assert!(query.params().is_empty());
    }
}
