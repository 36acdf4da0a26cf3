//! In-memory mirror of the signed-in user's monitored sources.
//!
//! The cache is only ever replaced from the collaborator's answer. A failed
//! call leaves it exactly as it was.

use reqwest::Url;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::{ClientError, ClientResult};
use crate::models::{MonitoredSource, SourceUpdate};
use crate::repositories::SourceRepository;

pub struct LinkCache {
    repository: Arc<dyn SourceRepository>,
    sources: RwLock<Vec<MonitoredSource>>,
}

impl LinkCache {
    pub fn new(repository: Arc<dyn SourceRepository>) -> Self {
        Self {
            repository,
            sources: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the cached set.
    pub async fn sources(&self) -> Vec<MonitoredSource> {
        self.sources.read().await.clone()
    }

    pub async fn enabled(&self) -> Vec<MonitoredSource> {
        self.sources
            .read()
            .await
            .iter()
            .filter(|source| source.is_enabled())
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<MonitoredSource> {
        self.sources
            .read()
            .await
            .iter()
            .find(|source| source.id == id)
            .cloned()
    }

    /// Replaces the whole cached set with the collaborator's current set.
    pub async fn refresh(&self) -> ClientResult<Vec<MonitoredSource>> {
        let fresh = self.repository.list().await.map_err(|e| {
            warn!("Source refresh failed, keeping cached set: {}", e);
            e
        })?;
        *self.sources.write().await = fresh.clone();
        Ok(fresh)
    }

    /// Creates a source remotely, then re-syncs the cache.
    ///
    /// Succeeds once the create succeeds; a failed follow-up refresh is only
    /// logged, and the cache keeps its previous contents.
    pub async fn add(&self, address: &str, label: &str) -> ClientResult<MonitoredSource> {
        let address = address.trim();
        let label = label.trim();
        Url::parse(address)
            .map_err(|e| ClientError::validation(format!("Invalid source URL '{}': {}", address, e)))?;
        if label.is_empty() {
            return Err(ClientError::validation("Source name is required"));
        }

        let created = self.repository.create(address, label).await?;
        info!("Added monitored source {} ({})", created.label, created.id);

        if let Err(e) = self.refresh().await {
            warn!("Source {} created but the cache could not be refreshed: {}", created.id, e);
            return Ok(created);
        }
        Ok(self.get(&created.id).await.unwrap_or(created))
    }

    /// Applies a partial update remotely, then re-syncs the cache.
    pub async fn update(&self, id: &str, changes: &SourceUpdate) -> ClientResult<MonitoredSource> {
        if changes.is_empty() {
            return Err(ClientError::validation("Nothing to update"));
        }
        if let Some(address) = &changes.address {
            Url::parse(address.trim()).map_err(|e| {
                ClientError::validation(format!("Invalid source URL '{}': {}", address, e))
            })?;
        }

        let updated = self.repository.update(id, changes).await?;
        if let Err(e) = self.refresh().await {
            warn!("Source {} updated but the cache could not be refreshed: {}", id, e);
            return Ok(updated);
        }
        Ok(self.get(id).await.unwrap_or(updated))
    }

    /// Deletes remotely and drops the entry locally; no refetch needed.
    pub async fn remove(&self, id: &str) -> ClientResult<()> {
        self.repository.delete(id).await?;
        self.sources.write().await.retain(|source| source.id != id);
        info!("Removed monitored source {}", id);
        Ok(())
    }

    /// Flips a cached source between enabled and disabled.
    pub async fn toggle(&self, id: &str) -> ClientResult<MonitoredSource> {
        let current = self
            .get(id)
            .await
            .ok_or_else(|| ClientError::validation(format!("Unknown source '{}'", id)))?;
        self.update(id, &SourceUpdate::state(current.state.toggled()))
            .await
    }
}
