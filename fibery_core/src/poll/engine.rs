use crate::poll::models::{
    Checkpoint, CheckpointKey, Envelope, PollOutcome, PollSource, SourceEvent, ID_FIELD,
};
use crate::poll::traits::{CheckpointStore, Entity, EventSink, QueryExecutor, SchemaSource};
use crate::query::assemble;
use crate::query::models::QueryOptions;
use crate::schema::cache::SchemaCache;
use crate::schema::index::SchemaIndex;
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// External collaborators a poll cycle depends on.
#[derive(Clone)]
pub struct PollDeps {
    pub schema_source: Arc<dyn SchemaSource>,
    pub executor: Arc<dyn QueryExecutor>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub sink: Arc<dyn EventSink>,
}

/// Checkpoint-driven poll cycle for one source.
///
/// Each run: load checkpoint (default: now) -> assemble query -> execute -> emit
/// every entity -> persist the highest incremental value. The checkpoint moves only
/// after every entity was emitted, so failures re-deliver on the next run.
pub struct PollCycle {
    source: PollSource,
    schema: SchemaCache,
    deps: PollDeps,
}

impl PollCycle {
    #[tracing::instrument(level = "debug", skip(deps))]
    pub fn new(source: PollSource, deps: PollDeps) -> Self {
        Self {
            source,
            schema: SchemaCache::new(),
            deps,
        }
    }

    /// Use an already-built schema cache (e.g. shared with option pickers).
    pub fn with_schema_cache(mut self, schema: SchemaCache) -> Self {
        self.schema = schema;
        self
    }

    pub fn source(&self) -> &PollSource {
        &self.source
    }

    pub async fn schema(&self) -> Result<Arc<SchemaIndex>> {
        self.schema
            .get_or_load(self.deps.schema_source.as_ref())
            .await
    }

    /// Drop the cached schema and fetch it again.
    pub async fn refresh_schema(&self) -> Result<Arc<SchemaIndex>> {
        self.schema.refresh(self.deps.schema_source.as_ref()).await
    }

    pub async fn run(&self) -> Result<PollOutcome> {
        self.run_at(Utc::now()).await
    }

    /// Run one cycle with `now` as the wall-clock time.
    ///
    /// Without a stored checkpoint the filter bound defaults to `now`. The bound is
    /// serialized at millisecond precision, so it may sit up to 1 ms before `now`.
    #[tracing::instrument(
        level = "info",
        skip(self),
        fields(account = %self.source.account_name, entity_type = %self.source.entity_type)
    )]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PollOutcome> {
        let run_id = Uuid::new_v4();
        let index = self.schema().await?;
        let entity_type = index.require(&self.source.entity_type)?.name.clone();

        let key = CheckpointKey::new(&self.source.account_name, &entity_type);
        let last_checkpoint = self
            .deps
            .checkpoints
            .get_checkpoint(&key)
            .await
            .map_err(|e| checkpoint_failure("get checkpoint", e))?
            .unwrap_or(now);

        let options = QueryOptions {
            fields: self.source.fields.clone(),
            incremental_fields: Some(self.source.incremental_fields.clone()),
            limit: self.source.limit,
            checkpoint: Some(serde_json::Value::String(
                last_checkpoint.to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
        };
        let query = assemble(&index, &entity_type, &options)?;
        tracing::debug!(query = ?query.query(), params = ?query.params(), "query");

        let entities = self
            .deps
            .executor
            .execute_query(&query)
            .await
            .map_err(query_failure)?;
        if entities.is_empty() {
            tracing::info!("no new entities");
            return Ok(PollOutcome {
                run_id,
                entity_type,
                emitted: 0,
                checkpoint: None,
            });
        }

        let mut max_seen: Option<DateTime<Utc>> = None;
        let mut entity_ids = Vec::with_capacity(entities.len());
        for (idx, entity) in entities.into_iter().enumerate() {
            let id = entity_id(&entity)?;
            let value = incremental_value(&entity, &self.source.incremental_fields);
            let summary = serde_json::to_string(&entity)
                .map_err(|e| Error::backend("serialize entity summary", e))?;
            let envelope = Envelope::new(id.clone(), value.unwrap_or(now), summary)?;
            let event = SourceEvent {
                entity,
                entity_type: entity_type.clone(),
                last_checkpoint,
                number: idx + 1,
            };

            self.deps
                .sink
                .emit(event, envelope)
                .await
                .map_err(|e| emit_failure(&id, e))?;

            if let Some(v) = value {
                if max_seen.map_or(true, |m| v > m) {
                    max_seen = Some(v);
                }
            }
            entity_ids.push(id);
        }
        tracing::info!(emitted = entity_ids.len(), ids = ?entity_ids, "emitted new entities");

        // The checkpoint never moves backwards, even if the executor returned
        // entities at or below the bound.
        let checkpoint = match max_seen {
            Some(value) if value > last_checkpoint => {
                self.deps
                    .checkpoints
                    .set_checkpoint(&key, value)
                    .await
                    .map_err(|e| checkpoint_failure("set checkpoint", e))?;
                Some(Checkpoint { key, value })
            }
            Some(value) => {
                tracing::info!(
                    max_seen = %value,
                    checkpoint = %last_checkpoint,
                    "no entity past the checkpoint; checkpoint unchanged"
                );
                None
            }
            None => {
                tracing::warn!(
                    fields = ?self.source.incremental_fields,
                    "no entity carried a parseable incremental value; checkpoint unchanged"
                );
                None
            }
        };

        Ok(PollOutcome {
            run_id,
            entity_type,
            emitted: entity_ids.len() as u64,
            checkpoint,
        })
    }
}

fn entity_id(entity: &Entity) -> Result<String> {
    match entity.get(ID_FIELD) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::InvalidInput(format!("entity is missing '{ID_FIELD}'"))),
    }
}

/// Highest parseable timestamp among `fields` on `entity`.
pub fn incremental_value(entity: &Entity, fields: &[String]) -> Option<DateTime<Utc>> {
    fields
        .iter()
        .filter_map(|f| entity.get(f).and_then(|v| v.as_str()))
        .filter_map(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .max()
}

fn query_failure(e: Error) -> Error {
    match e {
        e @ Error::QueryExecution { .. } => e,
        other => Error::query_execution(other),
    }
}

fn checkpoint_failure(context: &str, e: Error) -> Error {
    match e {
        e @ Error::Checkpoint { .. } => e,
        other => Error::checkpoint(context, other),
    }
}

fn emit_failure(entity_id: &str, e: Error) -> Error {
    match e {
        e @ Error::Emit { .. } => e,
        other => Error::emit(entity_id, other),
    }
}
