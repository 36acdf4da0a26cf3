//! Error payload handling for responses from the remote collaborator.
//!
//! Failed requests carry a JSON body whose human-readable text lives in one of
//! `error`, `msg` or `message`, depending on which layer of the collaborator
//! produced it. Anything else collapses into a generic status message.

use reqwest::StatusCode;
use serde::Deserialize;

/// Error body returned by the collaborator on non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorPayload {
    fn into_message(self) -> Option<String> {
        [self.error, self.msg, self.message]
            .into_iter()
            .flatten()
            .map(|message| message.trim().to_string())
            .find(|message| !message.is_empty())
    }
}

/// Extracts the message to surface for a failed response.
pub fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(ErrorPayload::into_message)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

/// Whether a status on a bearer-authenticated call means the token is no good.
///
/// The collaborator answers 401 for missing/expired tokens and 422 for tokens
/// it cannot decode.
pub fn is_token_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::UNPROCESSABLE_ENTITY
}
