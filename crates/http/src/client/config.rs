//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,

    /// Transport timeout in seconds; `None` leaves calls unbounded
    pub timeout_secs: Option<u64>,

    /// User agent sent with every call
    pub user_agent: String,

    /// Authentication endpoint paths
    pub endpoints: EndpointConfig,
}

/// Paths of the authentication endpoints, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub login: String,
    pub register: String,
    pub refresh: String,
    pub me: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: None,
            user_agent: "simulador-client/0.1.0".to_string(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login: "/api/auth/login".to_string(),
            register: "/api/auth/register".to_string(),
            refresh: "/api/auth/refresh".to_string(),
            me: "/api/auth/me".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl EndpointConfig {
    /// Endpoints whose 401 answers must never start a renewal
    pub fn renewal_exempt(&self) -> [&str; 3] {
        [
            self.login.as_str(),
            self.register.as_str(),
            self.refresh.as_str(),
        ]
    }
}
