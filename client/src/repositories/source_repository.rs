//! Monitored-source endpoints (`/api/urls`).

use async_trait::async_trait;
use tracing::debug;

use crate::api::dto::{CreateSourceRequest, SourceDto};
use crate::api::gateway::RemoteGateway;
use crate::errors::ClientResult;
use crate::models::{MonitoredSource, SourceUpdate};
use crate::repositories::SourceRepository;

#[derive(Debug, Clone)]
pub struct RemoteSourceRepository {
    gateway: RemoteGateway,
}

impl RemoteSourceRepository {
    pub fn new(gateway: RemoteGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl SourceRepository for RemoteSourceRepository {
    async fn list(&self) -> ClientResult<Vec<MonitoredSource>> {
        let sources: Vec<SourceDto> = self.gateway.get("/api/urls").await?;
        debug!("Fetched {} monitored sources", sources.len());
        Ok(sources.into_iter().map(MonitoredSource::from).collect())
    }

    async fn create(&self, address: &str, label: &str) -> ClientResult<MonitoredSource> {
        let request = CreateSourceRequest {
            url: address,
            name: label,
        };
        let created: SourceDto = self.gateway.post("/api/urls", &request).await?;
        Ok(created.into())
    }

    async fn update(&self, id: &str, changes: &SourceUpdate) -> ClientResult<MonitoredSource> {
        let updated: SourceDto = self
            .gateway
            .put(&format!("/api/urls/{}", id), changes)
            .await?;
        Ok(updated.into())
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        self.gateway.delete(&format!("/api/urls/{}", id)).await
    }
}
