//! Module for the client's core business logic.
//!
//! Holds the local caches mirroring the remote collaborator, the active
//! search-term set, the decorative scan timeline and the orchestrator that
//! joins that timeline with a remote scan.

pub mod animation;
pub mod link_cache;
pub mod scan_history;
pub mod scan_orchestrator;
pub mod search_terms;
