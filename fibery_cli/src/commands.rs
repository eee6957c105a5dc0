use crate::cli::{PollArgs, QueryArgs};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use fibery_core::poll::memory::{MemoryEventSink, StaticSchemaSource};
use fibery_core::{
    assemble, field_options, type_options, CheckpointKey, CheckpointStore, Entity, Envelope,
    EventSink, FieldRef, PollCycle, PollDeps, PollScheduler, PollerConfig, QueryExecutor,
    QueryObject, QueryOptions, RawSchema, SchemaIndex, SourceEvent,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Load a schema dump (either a type array or a name-keyed map).
#[tracing::instrument(level = "debug")]
pub async fn load_schema(path: &Path) -> anyhow::Result<SchemaIndex> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read schema {}", path.display()))?;
    let schema: RawSchema = serde_json::from_str(&raw)
        .with_context(|| format!("parse schema {}", path.display()))?;
    Ok(SchemaIndex::from_raw(schema))
}

pub fn types(index: &SchemaIndex) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(type_options(index))?)
}

pub fn fields(index: &SchemaIndex, entity_type: &str) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(field_options(index, entity_type))?)
}

pub fn query(index: &SchemaIndex, args: &QueryArgs) -> anyhow::Result<Value> {
    let checkpoint = args
        .since
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| {
                    dt.with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Millis, true)
                })
                .with_context(|| format!("--since is not RFC 3339: {raw}"))
        })
        .transpose()?;
    let options = QueryOptions {
        fields: args.fields.iter().map(|f| FieldRef::from(f.as_str())).collect(),
        incremental_fields: Some(args.kind.incremental_fields()),
        limit: args.kind.resolve_limit(args.limit),
        checkpoint: checkpoint.map(Value::String),
    };
    let query = assemble(index, &args.entity_type, &options)?;
    Ok(query.to_json()?)
}

pub fn config(cfg: &PollerConfig) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(cfg)?)
}

async fn replay_cycle(
    cfg: &PollerConfig,
    args: &PollArgs,
    sink: Arc<dyn EventSink>,
) -> anyhow::Result<PollCycle> {
    let index = load_schema(&args.schema).await?;
    let deps = PollDeps {
        schema_source: Arc::new(StaticSchemaSource::new(index.types().to_vec())),
        executor: Arc::new(FileQueryExecutor::new(&args.entities)),
        checkpoints: Arc::new(FileCheckpointStore::new(&args.state)),
        sink,
    };
    Ok(PollCycle::new(cfg.to_poll_source()?, deps))
}

/// Run one cycle for `cfg` with the dump in `args.entities` standing in for the
/// workspace.
///
/// Returns the outcome plus every emitted envelope and event.
#[tracing::instrument(level = "info", skip(cfg))]
pub async fn poll(cfg: &PollerConfig, args: &PollArgs) -> anyhow::Result<Value> {
    let sink = MemoryEventSink::new();
    let cycle = replay_cycle(cfg, args, Arc::new(sink.clone())).await?;
    let outcome = cycle.run().await?;

    let emitted: Vec<Value> = sink
        .all_events()
        .await
        .into_iter()
        .map(|(event, envelope)| json!({ "envelope": envelope, "event": event }))
        .collect();
    Ok(json!({ "outcome": outcome, "emitted": emitted }))
}

/// Poll every `cfg.poll_interval()` until `shutdown` flips, printing each emitted
/// entity as a JSON line.
#[tracing::instrument(level = "info", skip(cfg, shutdown))]
pub async fn run(
    cfg: &PollerConfig,
    args: &PollArgs,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let cycle = replay_cycle(cfg, args, Arc::new(StdoutEventSink)).await?;
    let scheduler = PollScheduler::new(Arc::new(cycle), cfg.poll_interval())?;
    scheduler.run_loop(shutdown).await?;
    Ok(())
}

/// Serves queries from an entity dump, re-read on every call.
///
/// The query's filter, ordering and limit are evaluated locally, so a replay
/// honours the checkpoint bound the way the workspace would.
#[derive(Debug)]
pub struct FileQueryExecutor {
    path: PathBuf,
}

impl FileQueryExecutor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QueryExecutor for FileQueryExecutor {
    async fn execute_query(&self, query: &QueryObject) -> fibery_core::Result<Vec<Entity>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| fibery_core::Error::backend("read entity dump", e))?;
        let entities: Vec<Entity> = serde_json::from_str(&raw)
            .map_err(|e| fibery_core::Error::backend("parse entity dump", e))?;
        Ok(query.apply_local(entities))
    }
}

/// Writes every emitted entity to stdout as one JSON line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: SourceEvent, envelope: Envelope) -> fibery_core::Result<()> {
        let line = serde_json::to_string(&json!({ "envelope": envelope, "event": event }))
            .map_err(|e| fibery_core::Error::backend("serialize event", e))?;
        println!("{line}");
        Ok(())
    }
}

/// Checkpoints kept in a single JSON object on disk.
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> fibery_core::Result<BTreeMap<String, DateTime<Utc>>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| fibery_core::Error::backend("parse checkpoint file", e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(fibery_core::Error::backend("read checkpoint file", e)),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get_checkpoint(
        &self,
        key: &CheckpointKey,
    ) -> fibery_core::Result<Option<DateTime<Utc>>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.get(key.as_str()).copied())
    }

    async fn set_checkpoint(
        &self,
        key: &CheckpointKey,
        value: DateTime<Utc>,
    ) -> fibery_core::Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.as_str().to_string(), value);
        let raw = serde_json::to_string_pretty(&all)
            .map_err(|e| fibery_core::Error::backend("serialize checkpoints", e))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| fibery_core::Error::backend("write checkpoint file", e))
    }
}
