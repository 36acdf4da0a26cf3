//! Scan endpoints (`/api/scan`, `/api/scans`).

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::dto::{RunScanRequest, ScanDto};
use crate::api::gateway::RemoteGateway;
use crate::errors::ClientResult;
use crate::models::ScanRecord;
use crate::repositories::ScanRepository;

#[derive(Debug, Clone)]
pub struct RemoteScanRepository {
    gateway: RemoteGateway,
}

impl RemoteScanRepository {
    pub fn new(gateway: RemoteGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ScanRepository for RemoteScanRepository {
    async fn list(&self) -> ClientResult<Vec<ScanRecord>> {
        let scans: Vec<ScanDto> = self.gateway.get("/api/scans").await?;
        debug!("Fetched {} scan records", scans.len());
        Ok(scans.into_iter().map(ScanRecord::from).collect())
    }

    async fn run(&self, keywords: &[String]) -> ClientResult<ScanRecord> {
        info!("Requesting scan for {} term(s)", keywords.len());
        let scan: ScanDto = self
            .gateway
            .post("/api/scan", &RunScanRequest { keywords })
            .await?;
        Ok(scan.into())
    }
}
