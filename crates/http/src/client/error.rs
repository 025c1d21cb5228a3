//! Client error types

use thiserror::Error;

/// Failure of the transport itself, before any status code is seen
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Why a token renewal did not produce a new access token.
///
/// One renewal outcome is delivered to every caller waiting on it, so this
/// type is `Clone` and carries only owned text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewalError {
    /// No refresh token is stored; the refresh endpoint was not contacted
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint answered with an error status
    #[error("Refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh endpoint answered 2xx with an unusable body
    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The refresh call never produced a response
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// The renewed tokens could not be written to the credential store
    #[error("Failed to store renewed tokens: {0}")]
    Storage(String),

    /// The caller driving the renewal went away before it concluded
    #[error("Token renewal was interrupted")]
    Interrupted,
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A login, register or refresh call failed; never triggers renewal
    #[error("Authentication endpoint returned {status}: {message}")]
    AuthEndpoint { status: u16, message: String },

    /// The call was replayed with a renewed token and was rejected again
    #[error("Request unauthorized after token renewal: {0}")]
    RetryExhausted(String),

    /// The session could not be renewed and has been torn down
    #[error("Session renewal failed: {0}")]
    RenewalFailed(#[from] RenewalError),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential store failure outside of renewal
    #[error("Session storage error: {0}")]
    Storage(#[from] simulador_core::CoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status carried by the error, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthEndpoint { status, .. } | Self::ServerError { status, .. } => Some(*status),
            Self::RetryExhausted(_) => Some(401),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RenewalFailed(RenewalError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// True when the session is gone and the user has to sign in again
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::RenewalFailed(err) if *err != RenewalError::Interrupted)
    }
}
