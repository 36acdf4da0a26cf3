//! JSON shapes exchanged with the remote collaborator's `/api` endpoints, and
//! their conversion into the client's domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MonitoredSource, ScanOutcome, ScanRecord, SearchTerm, SourceState, TermCategory};
use crate::utils::{deserialize_null_as_empty, serde_id, serde_timestamp};

#[derive(Debug, Serialize)]
pub struct CreateSourceRequest<'a> {
    pub url: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDto {
    #[serde(with = "serde_id")]
    pub id: String,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub status: SourceState,
    #[serde(default, deserialize_with = "serde_timestamp::deserialize")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "serde_timestamp::deserialize")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl From<SourceDto> for MonitoredSource {
    fn from(dto: SourceDto) -> Self {
        MonitoredSource {
            id: dto.id,
            address: dto.url,
            label: dto.name,
            state: dto.status,
            added_at: dto.added_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            last_checked: dto.last_checked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunScanRequest<'a> {
    pub keywords: &'a [String],
}

/// One match reported by the collaborator: either a detailed entry or a bare
/// source string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MatchDto {
    Detailed {
        url: String,
        #[serde(default, deserialize_with = "deserialize_null_as_empty")]
        keywords: Vec<String>,
    },
    Bare(String),
}

impl MatchDto {
    fn source(&self) -> &str {
        match self {
            MatchDto::Detailed { url, .. } => url,
            MatchDto::Bare(source) => source,
        }
    }

    fn terms(&self) -> Vec<&str> {
        match self {
            MatchDto::Detailed { keywords, .. } if !keywords.is_empty() => {
                keywords.iter().map(String::as_str).collect()
            }
            MatchDto::Detailed { url, .. } => vec![url.as_str()],
            MatchDto::Bare(source) => vec![source.as_str()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanDto {
    #[serde(with = "serde_id")]
    pub id: String,
    #[serde(default, with = "serde_id")]
    pub user_id: String,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub matches: Vec<MatchDto>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub urls_scanned: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub errors: Vec<String>,
    #[serde(default, deserialize_with = "serde_timestamp::deserialize")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "serde_timestamp::deserialize")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ScanDto> for ScanRecord {
    fn from(dto: ScanDto) -> Self {
        let outcome = if dto.matches.is_empty() {
            ScanOutcome::Safe
        } else {
            ScanOutcome::Breached
        };

        let breached_sources = dto
            .matches
            .iter()
            .map(|entry| entry.source().to_string())
            .collect();

        let mut matched_terms: Vec<String> = Vec::new();
        for term in dto.matches.iter().flat_map(MatchDto::terms) {
            if !matched_terms.iter().any(|seen| seen.eq_ignore_ascii_case(term)) {
                matched_terms.push(term.to_string());
            }
        }

        let terms = dto
            .keywords
            .into_iter()
            .enumerate()
            .map(|(index, value)| SearchTerm {
                id: index.to_string(),
                value,
                category: TermCategory::Custom,
            })
            .collect();

        let started_at = dto.started_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let duration_seconds = match (dto.started_at, dto.completed_at) {
            (Some(started), Some(completed)) => {
                ((completed - started).num_milliseconds() as f64 / 1000.0).max(0.0)
            }
            _ => 0.0,
        };

        ScanRecord {
            id: dto.id,
            owner_id: dto.user_id,
            terms,
            outcome,
            breached_sources,
            matched_terms,
            scanned_sources: dto.urls_scanned,
            errors: dto.errors,
            started_at,
            duration_seconds,
        }
    }
}
