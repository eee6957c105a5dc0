use crate::poll::traits::Entity;
use crate::query::select::SelectSpec;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// Wire marker for "no limit" in the query language.
pub const NO_LIMIT: &str = "q/no-limit";

/// Parameter name the checkpoint value is bound to.
pub const CHECKPOINT_PARAM: &str = "$lastMaxTimestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Bounded(NonZeroU32),
    Unbounded,
}

impl Limit {
    /// A positive limit is kept; zero or absent means unbounded.
    pub fn from_option(limit: Option<u32>) -> Self {
        limit
            .and_then(NonZeroU32::new)
            .map(Limit::Bounded)
            .unwrap_or(Limit::Unbounded)
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Bounded(n) => serializer.serialize_u32(n.get()),
            Limit::Unbounded => serializer.serialize_str(NO_LIMIT),
        }
    }
}

/// Ascending sort marker in `q/order-by`.
pub const ORDER_ASC: &str = "q/asc";

/// One `q/order-by` clause: `[[field], "q/asc"]`. Incremental fetch only ever
/// sorts ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: String,
}

impl OrderClause {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Serialize for OrderClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&[&self.field])?;
        seq.serialize_element(ORDER_ASC)?;
        seq.end()
    }
}

/// `q/where` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `[">", [field], "$param"]`
    GreaterThan { field: String, param: String },
    /// `["q/or", clause, ...]`
    Or(Vec<Filter>),
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Filter::GreaterThan { field, param } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(">")?;
                seq.serialize_element(&[field])?;
                seq.serialize_element(param)?;
                seq.end()
            }
            Filter::Or(clauses) => {
                let mut seq = serializer.serialize_seq(Some(clauses.len() + 1))?;
                seq.serialize_element("q/or")?;
                for clause in clauses {
                    seq.serialize_element(clause)?;
                }
                seq.end()
            }
        }
    }
}

impl Filter {
    /// Whether `entity` satisfies this clause with `params` bound.
    ///
    /// Values compare as RFC 3339 timestamps; a missing or unparseable value on
    /// either side never matches.
    pub fn matches(&self, entity: &Entity, params: &BTreeMap<String, serde_json::Value>) -> bool {
        match self {
            Filter::GreaterThan { field, param } => {
                let bound = params
                    .get(param)
                    .and_then(|v| v.as_str())
                    .and_then(parse_timestamp);
                match (timestamp(entity, field), bound) {
                    (Some(value), Some(bound)) => value > bound,
                    _ => false,
                }
            }
            Filter::Or(clauses) => clauses.iter().any(|c| c.matches(entity, params)),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn timestamp(entity: &Entity, field: &str) -> Option<DateTime<Utc>> {
    entity
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(parse_timestamp)
}

/// A requested field as it arrives from source configuration.
///
/// Plain strings are field names when they contain a namespace separator, field
/// ids otherwise. Picker options carry the name in `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Key(String),
    Labeled {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl From<&str> for FieldRef {
    fn from(s: &str) -> Self {
        FieldRef::Key(s.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(s: String) -> Self {
        FieldRef::Key(s)
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Key(key) => f.write_str(key),
            FieldRef::Labeled { label, .. } => write!(f, "{{label: {label}}}"),
        }
    }
}

/// Inputs to query assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub fields: Vec<FieldRef>,
    /// Timestamp-like fields compared against the checkpoint.
    #[serde(default)]
    pub incremental_fields: Option<Vec<String>>,
    /// Positive limit; zero or absent means unbounded.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Opaque value bound to `CHECKPOINT_PARAM`.
    #[serde(default)]
    pub checkpoint: Option<serde_json::Value>,
}

/// The `query` half of a query object, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    #[serde(rename = "q/from")]
    pub(crate) from: String,
    #[serde(rename = "q/select")]
    pub(crate) select: SelectSpec,
    #[serde(rename = "q/limit")]
    pub(crate) limit: Limit,
    #[serde(rename = "q/order-by", skip_serializing_if = "Vec::is_empty")]
    pub(crate) order_by: Vec<OrderClause>,
    #[serde(rename = "q/where", skip_serializing_if = "Option::is_none")]
    pub(crate) filter: Option<Filter>,
}

/// A fully assembled entity query plus its bound parameters.
///
/// Built by `query::assemble`; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryObject {
    pub(crate) query: Query,
    pub(crate) params: BTreeMap<String, serde_json::Value>,
}

impl QueryObject {
    pub fn from_type(&self) -> &str {
        &self.query.from
    }

    pub fn select(&self) -> &SelectSpec {
        &self.query.select
    }

    pub fn limit(&self) -> Limit {
        self.query.limit
    }

    pub fn order_by(&self) -> &[OrderClause] {
        &self.query.order_by
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.query.filter.as_ref()
    }

    pub fn params(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.params
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Wire JSON: `{"query": {...}, "params": {...}}`.
    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| crate::Error::backend("serialize query", e))
    }

    /// Evaluate the query over already-fetched entities: keep those matching the
    /// filter, sort ascending by the order clauses, then apply the limit.
    ///
    /// Used by local executors that replay entity dumps instead of asking the
    /// workspace.
    pub fn apply_local(&self, entities: Vec<Entity>) -> Vec<Entity> {
        let mut matching: Vec<Entity> = entities
            .into_iter()
            .filter(|e| {
                self.query
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.matches(e, &self.params))
            })
            .collect();
        if !self.query.order_by.is_empty() {
            matching.sort_by(|a, b| {
                self.query
                    .order_by
                    .iter()
                    .map(|clause| timestamp(a, &clause.field).cmp(&timestamp(b, &clause.field)))
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Limit::Bounded(n) = self.query.limit {
            matching.truncate(n.get() as usize);
        }
        matching
    }
}
