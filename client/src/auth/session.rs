//! The session store: sole owner of the bearer token and current identity.
//!
//! Other components read the token through [`SessionStore::token`]; nothing
//! else reads the persisted keys directly.

use std::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::storage::{SessionStorage, TOKEN_KEY, USER_KEY};
use crate::models::{Identity, Session};

pub struct SessionStore {
    current: RwLock<Option<Session>>,
    storage: Box<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self {
            current: RwLock::new(None),
            storage: Box::new(storage),
        }
    }

    /// Bearer token of the active session, if any.
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|session| session.token.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().as_ref().map(|session| session.identity.clone())
    }

    pub fn session(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Token left behind by a previous process, awaiting verification.
    pub(crate) fn persisted_token(&self) -> Option<String> {
        self.storage
            .load(TOKEN_KEY)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Installs a verified session and persists both keys.
    ///
    /// A persistence failure is logged and the in-memory session is kept;
    /// the next process simply starts signed out.
    pub(crate) fn establish(&self, session: Session) {
        let mut current = self.write();
        self.persist(&session);
        debug!("Session established for {}", session.identity.email);
        *current = Some(session);
    }

    /// Drops the in-memory session and both persisted keys. Idempotent.
    pub fn clear(&self) {
        let mut current = self.write();
        let previous = current.take();
        self.forget_persisted();
        drop(current);

        if let Some(session) = previous {
            debug!("Session cleared for {}", session.identity.email);
        }
    }

    /// Clears the session only if it still carries `token`.
    ///
    /// A request that started with a token which has since been replaced must
    /// not sign out the newer session.
    pub(crate) fn clear_if_token(&self, token: &str) -> bool {
        let mut current = self.write();
        if !current.as_ref().is_some_and(|session| session.token == token) {
            return false;
        }
        let previous = current.take();
        self.forget_persisted();
        drop(current);

        if let Some(session) = previous {
            debug!("Session cleared for {}", session.identity.email);
        }
        true
    }

    /// Installs a session verified from a persisted token, unless a different
    /// session was established while the verification was in flight.
    pub(crate) fn establish_restored(&self, session: Session) -> bool {
        let mut current = self.write();
        if current.as_ref().is_some_and(|active| active.token != session.token) {
            return false;
        }
        self.persist(&session);
        debug!("Session restored for {}", session.identity.email);
        *current = Some(session);
        true
    }

    /// Drops persisted keys that could not be verified. A session
    /// established in the meantime under another token is left alone.
    pub(crate) fn discard_restored(&self, token: Option<&str>) -> bool {
        let mut current = self.write();
        if current
            .as_ref()
            .is_some_and(|active| Some(active.token.as_str()) != token)
        {
            return false;
        }
        current.take();
        self.forget_persisted();
        true
    }

    fn persist(&self, session: &Session) {
        match serde_json::to_string(&session.identity) {
            Ok(user) => {
                if let Err(e) = self
                    .storage
                    .save(&[(USER_KEY, user.as_str()), (TOKEN_KEY, session.token.as_str())])
                {
                    warn!("Failed to persist session: {:#}", e);
                }
            }
            Err(e) => warn!("Failed to encode identity for persistence: {}", e),
        }
    }

    fn forget_persisted(&self) {
        if let Err(e) = self.storage.remove(&[USER_KEY, TOKEN_KEY]) {
            warn!("Failed to clear persisted session: {:#}", e);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
