use crate::poll::models::{PollSource, SourceKind};
use crate::query::models::FieldRef;
use crate::{Error, Result};
use serde::Serialize;
use std::time::Duration;

pub const ENV_ACCOUNT_NAME: &str = "FIBERY_ACCOUNT_NAME";
pub const ENV_ENTITY_TYPE: &str = "FIBERY_ENTITY_TYPE";
pub const ENV_FIELDS: &str = "FIBERY_FIELDS";
pub const ENV_SOURCE_KIND: &str = "FIBERY_SOURCE_KIND";
pub const ENV_LIMIT: &str = "FIBERY_LIMIT";
pub const ENV_POLL_INTERVAL_SECS: &str = "FIBERY_POLL_INTERVAL_SECS";

/// Configuration for one poller process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollerConfig {
    pub account_name: String,
    /// Type name or type id.
    pub entity_type: String,
    /// Field names or field ids to select in addition to the type's defaults.
    pub fields: Vec<String>,
    pub source_kind: SourceKind,
    /// `None` uses the source kind's preset; `Some(0)` means unbounded.
    pub limit: Option<u32>,
    pub poll_interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            entity_type: String::new(),
            fields: Vec::new(),
            source_kind: SourceKind::CreatedOrUpdated,
            limit: None,
            poll_interval_secs: 300,
        }
    }
}

impl PollerConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (`from_env` uses the process environment).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::InvalidInput(format!("{key} is required")))
        };

        let account_name = required(ENV_ACCOUNT_NAME)?;
        let entity_type = required(ENV_ENTITY_TYPE)?;
        let fields = lookup(ENV_FIELDS)
            .map(|v| parse_field_list(&v))
            .unwrap_or_default();
        let source_kind = match lookup(ENV_SOURCE_KIND) {
            Some(v) if !v.trim().is_empty() => v.parse()?,
            _ => defaults.source_kind,
        };
        let limit = lookup(ENV_LIMIT)
            .map(|v| {
                v.trim().parse::<u32>().map_err(|_| {
                    Error::InvalidInput(format!("{ENV_LIMIT} must be a non-negative integer"))
                })
            })
            .transpose()?;
        let poll_interval_secs = lookup(ENV_POLL_INTERVAL_SECS)
            .map(|v| {
                v.trim().parse::<u64>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "{ENV_POLL_INTERVAL_SECS} must be a whole number of seconds"
                    ))
                })
            })
            .transpose()?
            .unwrap_or(defaults.poll_interval_secs);

        let cfg = Self {
            account_name,
            entity_type,
            fields,
            source_kind,
            limit,
            poll_interval_secs,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    #[tracing::instrument(level = "debug")]
    pub fn validate(&self) -> Result<()> {
        if self.account_name.trim().is_empty() {
            return Err(Error::InvalidInput("account_name is empty".to_string()));
        }
        if self.entity_type.trim().is_empty() {
            return Err(Error::InvalidInput("entity_type is empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::InvalidInput("poll_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Limit actually applied to queries (`None` = unbounded).
    pub fn effective_limit(&self) -> Option<u32> {
        self.source_kind.resolve_limit(self.limit)
    }

    pub fn to_poll_source(&self) -> Result<PollSource> {
        self.validate()?;
        let fields = self.fields.iter().map(|f| FieldRef::from(f.as_str())).collect();
        Ok(
            PollSource::for_kind(&self.account_name, &self.entity_type, fields, self.source_kind)?
                .with_limit(self.effective_limit()),
        )
    }
}

fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
