//! Authentication module for the client session.
//!
//! Holds the session store (token and identity, persisted across restarts)
//! and the service that signs users in and out against the remote
//! collaborator.

pub mod models;
pub mod service;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use service::AuthService;
pub use session::SessionStore;
