//! Core business logic for the client session lifecycle.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::api::gateway::RemoteGateway;
use crate::auth::models::*;
use crate::auth::session::SessionStore;
use crate::errors::{ClientError, ClientResult};
use crate::models::{Identity, Session};

/// Signs users in and out, and verifies a persisted session at startup.
#[derive(Debug, Clone)]
pub struct AuthService {
    gateway: RemoteGateway,
    store: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(gateway: RemoteGateway) -> Self {
        let store = gateway.session().clone();
        AuthService { gateway, store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Verifies the token left by a previous process.
    ///
    /// Returns the verified identity, or `None` when there was nothing to
    /// restore or verification failed. A failed verification clears both
    /// persisted keys, unless a sign-in completed while it was in flight.
    pub async fn restore(&self) -> Option<Identity> {
        let Some(token) = self.store.persisted_token() else {
            // a lone identity key without its token is never trusted
            self.store.discard_restored(None);
            return None;
        };

        match self.gateway.get_with_token::<Identity>("/auth/me", &token).await {
            Ok(identity) => {
                let restored = self.store.establish_restored(Session {
                    token,
                    identity: identity.clone(),
                });
                if !restored {
                    info!("Keeping the session established during restore");
                    return None;
                }
                info!("Restored session for {}", identity.email);
                Some(identity)
            }
            Err(e) => {
                warn!("Discarding persisted session: {}", e);
                self.store.discard_restored(Some(&token));
                None
            }
        }
    }

    /// Authenticates with the collaborator and installs the new session.
    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Identity> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response: LoginResponse = self.gateway.post_anonymous("/auth/login", &request).await?;
        if response.access_token.trim().is_empty() {
            warn!("Login for {} returned no access token", request.email);
            return Err(ClientError::remote(200, "Sign in failed"));
        }

        info!("Signed in as {}", response.user.email);
        self.store.establish(Session {
            token: response.access_token,
            identity: response.user.clone(),
        });
        Ok(response.user)
    }

    /// Registers a new account, then signs in with the same credentials.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> ClientResult<Identity> {
        let request = RegisterRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: display_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        };
        request.validate()?;

        let _: Value = self
            .gateway
            .post_anonymous("/auth/register", &request)
            .await?;
        info!("Registered {}", request.email);

        self.sign_in(&request.email, password).await
    }

    /// Drops the session and its persisted keys. Idempotent.
    pub fn sign_out(&self) {
        self.store.clear();
        info!("Signed out");
    }

    pub async fn forgot_password(&self, email: &str) -> ClientResult<()> {
        let request = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        request.validate()?;

        let _: Value = self
            .gateway
            .post_anonymous("/auth/forgot-password", &request)
            .await?;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> ClientResult<()> {
        let request = ResetPasswordRequest {
            token: token.trim().to_string(),
            password: new_password.to_string(),
        };
        request.validate()?;

        let _: Value = self
            .gateway
            .post_anonymous("/auth/reset-password", &request)
            .await?;
        Ok(())
    }
}
