//! Client-side session model

use serde::{Deserialize, Serialize};

/// Profile of the signed-in user as the backend reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "id_usuario")]
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
}

/// Credentials and profile held for the current session.
///
/// Token values are opaque: nothing here inspects or validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    /// Session as written after a successful login or registration
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: UserProfile,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user: Some(user),
        }
    }

    /// True when an access token is available to attach to requests
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}
