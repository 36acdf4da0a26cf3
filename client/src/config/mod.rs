//! Central module for client-wide configuration settings.
//!
//! This module handles loading the remote collaborator's base URL, the HTTP
//! timeout, the location of the persisted session file and the animation tick
//! cadence from the environment.

use anyhow::{Context, Result};
use expanduser::expanduser;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub session_file: PathBuf,
    pub tick_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("DARKWATCH_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string())
            .trim_end_matches('/')
            .to_string();

        let http_timeout_seconds = env::var("DARKWATCH_HTTP_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .context("DARKWATCH_HTTP_TIMEOUT_SECONDS must be a valid number")?;

        let session_file = env::var("DARKWATCH_SESSION_FILE")
            .unwrap_or_else(|_| "~/.darkwatch/session.json".to_string());
        let session_file = expanduser(&session_file)
            .with_context(|| format!("DARKWATCH_SESSION_FILE is not a valid path: {}", session_file))?;

        let tick_interval_ms = env::var("DARKWATCH_TICK_INTERVAL_MS")
            .unwrap_or_else(|_| "50".to_string())
            .parse::<u64>()
            .context("DARKWATCH_TICK_INTERVAL_MS must be a valid number")?;

        if tick_interval_ms == 0 {
            anyhow::bail!("DARKWATCH_TICK_INTERVAL_MS must be greater than zero");
        }

        Ok(Config {
            api_base_url,
            http_timeout: Duration::from_secs(http_timeout_seconds),
            session_file,
            tick_interval: Duration::from_millis(tick_interval_ms),
        })
    }

    /// Configuration pointing at an explicit base URL, used when the caller
    /// already knows where the collaborator lives.
    pub fn for_base_url(api_base_url: impl Into<String>, session_file: PathBuf) -> Self {
        Config {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            http_timeout: Duration::from_secs(10),
            session_file,
            tick_interval: Duration::from_millis(50),
        }
    }
}
