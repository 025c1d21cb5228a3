//! Wire types for the authentication endpoints

use serde::{Deserialize, Serialize};
use simulador_core::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body returned by login, register and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
}

impl TokenResponse {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.user_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body returned by a renewal call. Only the token pair is required; the
/// backend also echoes the user, which refreshes the stored profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, rename = "nombre")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RefreshResponse {
    pub fn profile(&self) -> Option<UserProfile> {
        match (&self.user_id, &self.name, &self.email) {
            (Some(id), Some(name), Some(email)) => Some(UserProfile {
                id: id.clone(),
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}

/// Current user as returned by the `me` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id_usuario: String,
    pub nombre: String,
    pub email: String,
    #[serde(default = "default_active")]
    pub activo: bool,
}

impl UserResponse {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id_usuario.clone(),
            name: self.nombre.clone(),
            email: self.email.clone(),
        }
    }
}

fn default_active() -> bool {
    true
}
