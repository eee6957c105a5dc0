//! In-memory collaborators for local development and unit tests.

use crate::poll::models::{CheckpointKey, Envelope, SourceEvent};
use crate::poll::traits::{CheckpointStore, Entity, EventSink, QueryExecutor, SchemaSource};
use crate::query::models::QueryObject;
use crate::schema::models::TypeDescriptor;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serves a fixed schema and counts fetches.
#[derive(Debug, Default)]
pub struct StaticSchemaSource {
    types: Vec<TypeDescriptor>,
    failure: Option<String>,
    fetches: AtomicUsize,
}

impl StaticSchemaSource {
    pub fn new(types: Vec<TypeDescriptor>) -> Self {
        Self {
            types,
            ..Default::default()
        }
    }

    /// A source whose every fetch fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn fetch_schema(&self) -> Result<Vec<TypeDescriptor>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::BackendMessage(message.clone())),
            None => Ok(self.types.clone()),
        }
    }
}

/// Returns queued result batches in order (empty once drained) and records every query.
#[derive(Debug, Default)]
pub struct StaticQueryExecutor {
    batches: Mutex<Vec<Vec<Entity>>>,
    queries: Mutex<Vec<QueryObject>>,
    failure: Option<String>,
}

impl StaticQueryExecutor {
    pub fn new(batches: Vec<Vec<Entity>>) -> Self {
        Self {
            batches: Mutex::new(batches),
            ..Default::default()
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    /// Snapshot of all executed queries.
    pub async fn queries(&self) -> Vec<QueryObject> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl QueryExecutor for StaticQueryExecutor {
    async fn execute_query(&self, query: &QueryObject) -> Result<Vec<Entity>> {
        self.queries.lock().await.push(query.clone());
        if let Some(message) = &self.failure {
            return Err(Error::BackendMessage(message.clone()));
        }
        let mut batches = self.batches.lock().await;
        if batches.is_empty() {
            return Ok(Vec::new());
        }
        Ok(batches.remove(0))
    }
}

/// Process-lifetime checkpoint storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    values: Arc<Mutex<HashMap<CheckpointKey, DateTime<Utc>>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_checkpoint` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> Result<Option<DateTime<Utc>>> {
        Ok(self.values.lock().await.get(key).copied())
    }

    async fn set_checkpoint(&self, key: &CheckpointKey, value: DateTime<Utc>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.values.lock().await.insert(key.clone(), value);
        Ok(())
    }
}

/// Collects emitted events; optionally fails after a number of successful emits.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<(SourceEvent, Envelope)>>>,
    fail_after: Option<usize>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(successful_emits: usize) -> Self {
        Self {
            fail_after: Some(successful_emits),
            ..Default::default()
        }
    }

    /// Snapshot of all emitted events (primarily for tests).
    pub async fn all_events(&self) -> Vec<(SourceEvent, Envelope)> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn emit(&self, event: SourceEvent, envelope: Envelope) -> Result<()> {
        let mut events = self.events.lock().await;
        if self.fail_after.is_some_and(|n| events.len() >= n) {
            return Err(Error::BackendMessage(format!(
                "sink rejected entity {}",
                envelope.id
            )));
        }
        events.push((event, envelope));
        Ok(())
    }
}
