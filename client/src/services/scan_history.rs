//! In-memory mirror of past scan records, most recent first.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::ClientResult;
use crate::models::ScanRecord;
use crate::repositories::ScanRepository;

pub struct ScanHistoryCache {
    repository: Arc<dyn ScanRepository>,
    records: RwLock<Vec<ScanRecord>>,
}

impl ScanHistoryCache {
    pub fn new(repository: Arc<dyn ScanRepository>) -> Self {
        Self {
            repository,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Replaces the cached records with the collaborator's, newest first.
    ///
    /// Records with equal start times keep the collaborator's relative order.
    pub async fn refresh(&self) -> ClientResult<Vec<ScanRecord>> {
        let mut fresh = self.repository.list().await.map_err(|e| {
            warn!("Scan history refresh failed, keeping cached records: {}", e);
            e
        })?;
        fresh.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        debug!("Scan history holds {} records", fresh.len());

        *self.records.write().await = fresh.clone();
        Ok(fresh)
    }

    pub async fn records(&self) -> Vec<ScanRecord> {
        self.records.read().await.clone()
    }

    pub async fn latest(&self) -> Option<ScanRecord> {
        self.records.read().await.first().cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
