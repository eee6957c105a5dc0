//! Fibery sources: schema-driven query assembly and checkpointed polling for
//! Fibery workspace entities.

pub mod config;
pub mod error;
pub mod o11y;
pub mod poll;
pub mod query;
pub mod schema;

#[cfg(test)]
mod test_support;

pub use config::PollerConfig;
pub use error::{Error, Result};
pub use poll::engine::{PollCycle, PollDeps};
pub use poll::models::{
    Checkpoint, CheckpointKey, Envelope, PollOutcome, PollSource, SourceEvent, SourceKind,
};
pub use poll::schedule::PollScheduler;
pub use poll::traits::{CheckpointStore, Entity, EventSink, QueryExecutor, SchemaSource};
pub use query::models::{FieldRef, Limit, QueryObject, QueryOptions};
pub use query::{assemble, expand};
pub use schema::cache::SchemaCache;
pub use schema::index::SchemaIndex;
pub use schema::models::{FieldDescriptor, RawSchema, TypeDescriptor};
pub use schema::options::{field_options, type_options, PickerOption};
