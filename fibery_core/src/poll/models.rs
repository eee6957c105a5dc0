use crate::poll::traits::Entity;
use crate::query::models::FieldRef;
use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub const CREATION_DATE_FIELD: &str = "fibery/creation-date";
pub const MODIFICATION_DATE_FIELD: &str = "fibery/modification-date";
pub const ID_FIELD: &str = "fibery/id";

/// Storage key for the checkpoint of one (account, entity type) pair.
///
/// Both parts are base64url encoded (no `/` in the alphabet) before joining, so
/// distinct pairs never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey(String);

impl CheckpointKey {
    pub const PREFIX: &'static str = "lastMaxTimestamp";

    pub fn new(account: &str, entity_type: &str) -> Self {
        Self(format!(
            "{}/{}/{}",
            Self::PREFIX,
            URL_SAFE_NO_PAD.encode(account),
            URL_SAFE_NO_PAD.encode(entity_type)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted high-water mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub key: CheckpointKey,
    pub value: DateTime<Utc>,
}

/// Host-facing envelope for an emitted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The entity's own identity (`fibery/id`).
    pub id: String,
    pub ts: DateTime<Utc>,
    /// Compact JSON of the entity.
    pub summary: String,
}

impl Envelope {
    #[tracing::instrument(level = "debug", skip(summary))]
    pub fn new(
        id: impl Into<String> + std::fmt::Debug,
        ts: DateTime<Utc>,
        summary: String,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("envelope id is empty".to_string()));
        }
        Ok(Self { id, ts, summary })
    }
}

/// Payload emitted for every new or updated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub entity: Entity,
    pub entity_type: String,
    /// Checkpoint the cycle filtered against.
    pub last_checkpoint: DateTime<Utc>,
    /// 1-based position within the cycle.
    pub number: usize,
}

/// Which entity changes a source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Newly created entities (`fibery/creation-date`).
    Created,
    /// Created or modified entities (`fibery/creation-date` OR `fibery/modification-date`).
    CreatedOrUpdated,
}

impl SourceKind {
    pub fn incremental_fields(&self) -> Vec<String> {
        match self {
            SourceKind::Created => vec![CREATION_DATE_FIELD.to_string()],
            SourceKind::CreatedOrUpdated => vec![
                CREATION_DATE_FIELD.to_string(),
                MODIFICATION_DATE_FIELD.to_string(),
            ],
        }
    }

    pub fn default_limit(&self) -> Option<u32> {
        match self {
            SourceKind::Created => None,
            SourceKind::CreatedOrUpdated => Some(10),
        }
    }

    /// Limit to apply for a configured value: `Some(0)` is unbounded, `None` falls
    /// back to the preset.
    pub fn resolve_limit(&self, configured: Option<u32>) -> Option<u32> {
        match configured {
            Some(0) => None,
            Some(n) => Some(n),
            None => self.default_limit(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Created => "created",
            SourceKind::CreatedOrUpdated => "created_or_updated",
        }
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "created" => Ok(SourceKind::Created),
            "created_or_updated" => Ok(SourceKind::CreatedOrUpdated),
            other => Err(Error::InvalidInput(format!(
                "unknown source kind '{other}' (expected created | created_or_updated)"
            ))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one poller watches: an entity type in an account, which fields to select,
/// and which timestamp fields drive incremental fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSource {
    pub account_name: String,
    /// Type name or type id.
    pub entity_type: String,
    pub fields: Vec<FieldRef>,
    pub incremental_fields: Vec<String>,
    pub limit: Option<u32>,
}

impl PollSource {
    #[tracing::instrument(level = "debug", skip(fields))]
    pub fn new(
        account_name: impl Into<String> + std::fmt::Debug,
        entity_type: impl Into<String> + std::fmt::Debug,
        fields: Vec<FieldRef>,
        incremental_fields: Vec<String>,
        limit: Option<u32>,
    ) -> Result<Self> {
        let account_name = account_name.into();
        if account_name.trim().is_empty() {
            return Err(Error::InvalidInput("account_name is empty".to_string()));
        }
        let entity_type = entity_type.into();
        if entity_type.trim().is_empty() {
            return Err(Error::InvalidInput("entity_type is empty".to_string()));
        }
        if incremental_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "incremental field name is empty".to_string(),
            ));
        }
        Ok(Self {
            account_name,
            entity_type,
            fields,
            incremental_fields,
            limit,
        })
    }

    /// A source using the preset incremental fields and limit of `kind`.
    pub fn for_kind(
        account_name: impl Into<String> + std::fmt::Debug,
        entity_type: impl Into<String> + std::fmt::Debug,
        fields: Vec<FieldRef>,
        kind: SourceKind,
    ) -> Result<Self> {
        Self::new(
            account_name,
            entity_type,
            fields,
            kind.incremental_fields(),
            kind.default_limit(),
        )
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOutcome {
    pub run_id: Uuid,
    pub entity_type: String,
    pub emitted: u64,
    /// New checkpoint, if the cycle advanced it.
    pub checkpoint: Option<Checkpoint>,
}
