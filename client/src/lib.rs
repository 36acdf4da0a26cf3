//! Darkwatch client core.
//!
//! Manages the bearer-token session against the Darkwatch collaborator,
//! mirrors the user's monitored sources and scan history locally, and runs
//! breach scans by joining the remote computation with a fixed-length
//! progress timeline.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use context::AppContext;
pub use errors::{ClientError, ClientResult, OperationResult};
