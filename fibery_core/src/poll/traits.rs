use crate::poll::models::{CheckpointKey, Envelope, SourceEvent};
use crate::query::models::QueryObject;
use crate::schema::models::TypeDescriptor;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A single entity returned by a query, keyed by field name.
pub type Entity = serde_json::Map<String, serde_json::Value>;

/// Fetches the workspace schema. Called at most once per schema cache lifetime.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(&self) -> Result<Vec<TypeDescriptor>>;
}

/// Runs an assembled query against the workspace.
///
/// Returned entities contain at least the fields present in the query's select.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_query(&self, query: &QueryObject) -> Result<Vec<Entity>>;
}

/// Key-value storage for high-water-mark timestamps.
///
/// `get` and `set` are independent single-key operations.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> Result<Option<DateTime<Utc>>>;

    async fn set_checkpoint(&self, key: &CheckpointKey, value: DateTime<Utc>) -> Result<()>;
}

/// Receives emitted entities. The host dedupes on `envelope.id`.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: SourceEvent, envelope: Envelope) -> Result<()>;
}
