//! Authentication API client methods

use super::{ClientError, SessionClient};
use crate::types::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use reqwest::Method;
use simulador_core::{Session, UserProfile};
use tracing::{info, warn};

impl SessionClient {
    /// Sign in and store the returned session
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self
            .request(Method::POST, &self.endpoints.login)
            .json(serde_json::to_value(&body)?);
        let tokens: TokenResponse = self.execute(request).await?;
        self.start_session(&tokens)
    }

    /// Create an account and store the returned session
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let body = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self
            .request(Method::POST, &self.endpoints.register)
            .json(serde_json::to_value(&body)?);
        let tokens: TokenResponse = self.execute(request).await?;
        self.start_session(&tokens)
    }

    /// Forget the stored session
    pub fn logout(&self) -> Result<(), ClientError> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Get current user info (requires authentication)
    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        self.get_json(&self.endpoints.me).await
    }

    /// Validate a stored session against the backend.
    ///
    /// Returns `None` without a network call when no token and profile are
    /// stored. A session the backend no longer accepts is cleared.
    pub async fn restore_session(&self) -> Result<Option<UserProfile>, ClientError> {
        let session = self.store.get();
        if session.access_token.is_none() || session.user.is_none() {
            return Ok(None);
        }

        match self.me().await {
            Ok(user) => {
                let profile = user.profile();
                self.store.set_user(&profile)?;
                Ok(Some(profile))
            }
            Err(err) => {
                warn!(error = %err, "Stored session is no longer valid");
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    fn start_session(&self, tokens: &TokenResponse) -> Result<UserProfile, ClientError> {
        let profile = tokens.profile();
        self.store.set(&Session::new(
            tokens.access_token.as_str(),
            tokens.refresh_token.as_str(),
            profile.clone(),
        ))?;
        info!(user_id = %profile.id, "Session started");
        Ok(profile)
    }
}
