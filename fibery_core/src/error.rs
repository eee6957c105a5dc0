use std::error::Error as StdError;

/// Common error type for `fibery_core`.
///
/// Collaborator failures (schema fetch, query execution, emission, checkpoint
/// storage) keep their underlying error chain via the boxed `source`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A type name or id is absent from the schema. Fatal for the current cycle.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A requested field id or name does not resolve on its type. Callers drop it.
    #[error("field reference does not resolve: {0}")]
    FieldResolutionEmpty(String),

    #[error("schema fetch failed")]
    SchemaFetch {
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("query execution failed")]
    QueryExecution {
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("emit failed for entity {entity_id}")]
    Emit {
        entity_id: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("checkpoint store error: {context}")]
    Checkpoint {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("backend error: {0}")]
    BackendMessage(String),
}

impl Error {
    #[tracing::instrument(level = "debug", name = "fibery.error.backend", skip(source))]
    pub fn backend(
        context: impl Into<String> + std::fmt::Debug,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn schema_fetch(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::SchemaFetch {
            source: Box::new(source),
        }
    }

    pub fn query_execution(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::QueryExecution {
            source: Box::new(source),
        }
    }

    pub fn emit(
        entity_id: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Emit {
            entity_id: entity_id.into(),
            source: Box::new(source),
        }
    }

    pub fn checkpoint(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Checkpoint {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// True for failures that leave no persisted state behind and can be retried
    /// on the next tick with identical inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SchemaFetch { .. }
                | Self::QueryExecution { .. }
                | Self::Emit { .. }
                | Self::Checkpoint { .. }
                | Self::Backend { .. }
                | Self::BackendMessage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
