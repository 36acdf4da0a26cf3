//! The single seam for HTTP calls to the remote collaborator.
//!
//! Attaches the session's bearer token, applies the configured timeout and maps
//! every failure into a [`ClientError`]. Authenticated calls without a token
//! fail locally and never reach the network.

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::api::common::{error_message, is_token_rejection};
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::errors::{ClientError, ClientResult};

/// How a request authenticates itself.
#[derive(Debug, Clone, Copy)]
enum Credentials<'a> {
    Anonymous,
    Session,
    Token(&'a str),
}

#[derive(Debug, Clone)]
pub struct RemoteGateway {
    http_client: Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl RemoteGateway {
    /// Creates a new gateway bound to `config.api_base_url`.
    pub fn new(config: &Config, session: Arc<SessionStore>) -> ClientResult<Self> {
        let http_client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("Darkwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Authenticated GET.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let body = self
            .send(Method::GET, path, None, Credentials::Session)
            .await?;
        decode(path, &body)
    }

    /// Authenticated POST with a JSON body.
    pub async fn post<B, T>(&self, path: &str, payload: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(Method::POST, path, Some(encode(payload)?), Credentials::Session)
            .await?;
        decode(path, &body)
    }

    /// Authenticated PUT with a JSON body.
    pub async fn put<B, T>(&self, path: &str, payload: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(Method::PUT, path, Some(encode(payload)?), Credentials::Session)
            .await?;
        decode(path, &body)
    }

    /// Authenticated DELETE; the response body is ignored.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(Method::DELETE, path, None, Credentials::Session)
            .await
            .map(|_| ())
    }

    /// Unauthenticated POST, for the sign-in and password endpoints.
    pub async fn post_anonymous<B, T>(&self, path: &str, payload: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(Method::POST, path, Some(encode(payload)?), Credentials::Anonymous)
            .await?;
        decode(path, &body)
    }

    /// GET with an explicit token that is not (yet) the session's token.
    ///
    /// A rejected token is reported as [`ClientError::Auth`]; the session is
    /// left for the caller to manage.
    pub async fn get_with_token<T: DeserializeOwned>(&self, path: &str, token: &str) -> ClientResult<T> {
        let body = self
            .send(Method::GET, path, None, Credentials::Token(token))
            .await?;
        decode(path, &body)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<serde_json::Value>,
        credentials: Credentials<'_>,
    ) -> ClientResult<String> {
        let token = match credentials {
            Credentials::Anonymous => None,
            Credentials::Session => match self.session.token() {
                Some(token) => Some(token),
                None => {
                    warn!("Refusing {} {} without a session token", method, path);
                    return Err(ClientError::not_authenticated());
                }
            },
            Credentials::Token(token) => Some(token.to_string()),
        };

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.request(method.clone(), &url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = &payload {
            request = request.json(payload);
        }

        debug!("{} {}", method, path);
        let response = request.send().await.map_err(|e| {
            error!("{} {} received no response: {}", method, path, e);
            ClientError::transport(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("{} {} response body could not be read: {}", method, path, e);
            ClientError::transport(e.to_string())
        })?;

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(status, &body);
        match (&token, credentials) {
            (Some(token), Credentials::Session | Credentials::Token(_)) if is_token_rejection(status) => {
                warn!("{} {} rejected the bearer token ({}): {}", method, path, status, message);
                if matches!(credentials, Credentials::Session) {
                    self.session.clear_if_token(token);
                }
                Err(ClientError::auth(message))
            }
            _ => {
                warn!("{} {} failed with {}: {}", method, path, status, message);
                Err(ClientError::remote(status.as_u16(), message))
            }
        }
    }
}

fn encode<B: Serialize + ?Sized>(payload: &B) -> ClientResult<serde_json::Value> {
    serde_json::to_value(payload)
        .map_err(|e| ClientError::validation(format!("Request could not be encoded: {}", e)))
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> ClientResult<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| {
        error!("Malformed response from {}: {}", path, e);
        ClientError::remote(
            StatusCode::OK.as_u16(),
            format!("Malformed response payload: {}", e),
        )
    })
}
