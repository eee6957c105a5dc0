use crate::poll::traits::SchemaSource;
use crate::schema::index::SchemaIndex;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Schema cache owned by a poll cycle.
///
/// The schema is fetched at most once; nothing invalidates it implicitly. A remote
/// schema change is picked up only through `refresh` or a restart.
#[derive(Debug, Default)]
pub struct SchemaCache {
    index: RwLock<Option<Arc<SchemaIndex>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-indexed schema (no fetch will happen until `refresh`).
    pub fn preloaded(index: SchemaIndex) -> Self {
        Self {
            index: RwLock::new(Some(Arc::new(index))),
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn get_or_load(&self, source: &dyn SchemaSource) -> Result<Arc<SchemaIndex>> {
        if let Some(index) = self.index.read().await.as_ref() {
            return Ok(index.clone());
        }

        let mut slot = self.index.write().await;
        // Another caller may have loaded it while we waited for the write lock.
        if let Some(index) = slot.as_ref() {
            return Ok(index.clone());
        }
        let index = Arc::new(fetch_index(source).await?);
        *slot = Some(index.clone());
        Ok(index)
    }

    /// Re-fetch the schema unconditionally and replace the cached index.
    ///
    /// On failure the previously cached index (if any) is kept.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn refresh(&self, source: &dyn SchemaSource) -> Result<Arc<SchemaIndex>> {
        let index = Arc::new(fetch_index(source).await?);
        *self.index.write().await = Some(index.clone());
        Ok(index)
    }

    pub async fn is_loaded(&self) -> bool {
        self.index.read().await.is_some()
    }
}

async fn fetch_index(source: &dyn SchemaSource) -> Result<SchemaIndex> {
    let types = source.fetch_schema().await.map_err(|e| match e {
        e @ Error::SchemaFetch { .. } => e,
        other => Error::schema_fetch(other),
    })?;
    let index = SchemaIndex::new(types);
    tracing::info!(types = index.len(), "schema loaded");
    Ok(index)
}
