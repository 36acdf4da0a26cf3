//! Domain data model shared by the session, the caches and the orchestrator.
//!
//! These types are the client's own representation; the JSON shapes exchanged
//! with the remote collaborator live in `api::dto` and convert into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{serde_id, serde_timestamp};

/// Role granted to an identity by the remote collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    Client,
}

/// The signed-in principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(deserialize_with = "serde_id::deserialize")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(
        default,
        alias = "createdAt",
        deserialize_with = "serde_timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A bearer token together with the identity it was verified for.
///
/// Only ever constructed with both halves present, so the client can never
/// hold a token without an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

/// Kind of data a search term represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TermCategory {
    Email,
    Password,
    Phone,
    CreditCard,
    Username,
    #[default]
    Custom,
}

impl TermCategory {
    pub const ALL: [TermCategory; 6] = [
        TermCategory::Email,
        TermCategory::Password,
        TermCategory::Phone,
        TermCategory::CreditCard,
        TermCategory::Username,
        TermCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TermCategory::Email => "email",
            TermCategory::Password => "password",
            TermCategory::Phone => "phone",
            TermCategory::CreditCard => "creditcard",
            TermCategory::Username => "username",
            TermCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for TermCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for TermCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TermCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown term category '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub id: String,
    pub value: String,
    pub category: TermCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    #[default]
    Enabled,
    /// Also covers states this client does not recognise, so an unknown
    /// source is never scanned.
    #[serde(other)]
    Disabled,
}

impl SourceState {
    pub fn toggled(self) -> Self {
        match self {
            SourceState::Enabled => SourceState::Disabled,
            SourceState::Disabled => SourceState::Enabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceState::Enabled => "enabled",
            SourceState::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A remote location the scan collaborator searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredSource {
    pub id: String,
    pub address: String,
    pub label: String,
    pub state: SourceState,
    pub added_at: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl MonitoredSource {
    pub fn is_enabled(&self) -> bool {
        self.state == SourceState::Enabled
    }
}

/// Partial update of a monitored source; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceUpdate {
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "status", skip_serializing_if = "Option::is_none")]
    pub state: Option<SourceState>,
}

impl SourceUpdate {
    pub fn state(state: SourceState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_none() && self.label.is_none() && self.state.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOutcome {
    Safe,
    Breached,
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Safe => f.pad("safe"),
            ScanOutcome::Breached => f.pad("breached"),
        }
    }
}

/// An immutable record of one completed scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRecord {
    pub id: String,
    pub owner_id: String,
    pub terms: Vec<SearchTerm>,
    pub outcome: ScanOutcome,
    pub breached_sources: Vec<String>,
    pub matched_terms: Vec<String>,
    pub scanned_sources: Vec<String>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl ScanRecord {
    pub fn is_breached(&self) -> bool {
        self.outcome == ScanOutcome::Breached
    }
}
