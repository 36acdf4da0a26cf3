//! Repository seams over the remote collaborator's resource endpoints.
//!
//! The caches and the orchestrator depend on these traits rather than on the
//! gateway, so tests can substitute scripted implementations.

use async_trait::async_trait;

use crate::errors::ClientResult;
use crate::models::{MonitoredSource, ScanRecord, SourceUpdate};

pub mod scan_repository;
pub mod source_repository;

pub use scan_repository::RemoteScanRepository;
pub use source_repository::RemoteSourceRepository;

#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Every source owned by the signed-in identity.
    async fn list(&self) -> ClientResult<Vec<MonitoredSource>>;
    /// Creates a source and returns it with its server-assigned id.
    async fn create(&self, address: &str, label: &str) -> ClientResult<MonitoredSource>;
    /// Applies a partial update and returns the updated source.
    async fn update(&self, id: &str, changes: &SourceUpdate) -> ClientResult<MonitoredSource>;
    async fn delete(&self, id: &str) -> ClientResult<()>;
}

#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Past scans as reported by the collaborator, in its order.
    async fn list(&self) -> ClientResult<Vec<ScanRecord>>;
    /// Runs one scan for `keywords` and waits for its record.
    async fn run(&self, keywords: &[String]) -> ClientResult<ScanRecord>;
}
