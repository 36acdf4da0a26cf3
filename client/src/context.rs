//! Process-wide dependency root.
//!
//! Every component is built once here and handed out by reference; nothing in
//! the crate reaches for global state.

use std::sync::Arc;

use crate::api::gateway::RemoteGateway;
use crate::auth::service::AuthService;
use crate::auth::session::SessionStore;
use crate::auth::storage::{FileSessionStorage, SessionStorage};
use crate::config::Config;
use crate::errors::ClientResult;
use crate::repositories::{RemoteScanRepository, RemoteSourceRepository};
use crate::services::animation::{AnimationStep, SCAN_STEPS};
use crate::services::link_cache::LinkCache;
use crate::services::scan_history::ScanHistoryCache;
use crate::services::scan_orchestrator::ScanOrchestrator;

pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub auth: AuthService,
    pub links: Arc<LinkCache>,
    pub history: Arc<ScanHistoryCache>,
    pub orchestrator: ScanOrchestrator,
}

impl AppContext {
    /// Wires the client against `config`, persisting the session to
    /// `config.session_file`.
    pub fn new(config: Config) -> ClientResult<Self> {
        let storage = FileSessionStorage::new(config.session_file.clone());
        Self::with_storage(config, storage, SCAN_STEPS.to_vec())
    }

    pub fn with_storage(
        config: Config,
        storage: impl SessionStorage + 'static,
        scan_steps: Vec<AnimationStep>,
    ) -> ClientResult<Self> {
        let session = Arc::new(SessionStore::new(storage));
        let gateway = RemoteGateway::new(&config, session.clone())?;

        let auth = AuthService::new(gateway.clone());
        let links = Arc::new(LinkCache::new(Arc::new(RemoteSourceRepository::new(
            gateway.clone(),
        ))));
        let scans = Arc::new(RemoteScanRepository::new(gateway));
        let history = Arc::new(ScanHistoryCache::new(scans.clone()));
        let orchestrator = ScanOrchestrator::new(scans, history.clone(), config.tick_interval)
            .with_steps(scan_steps);

        Ok(Self {
            config,
            session,
            auth,
            links,
            history,
            orchestrator,
        })
    }
}
