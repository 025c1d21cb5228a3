//! Error type for session storage and credential handling

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised while persisting or reading session state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Session storage at {path} failed: {message}")]
    Storage { path: String, message: String },

    #[error("Stored entry '{key}' is malformed: {message}")]
    MalformedEntry { key: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl CoreError {
    /// Create a storage error for the backing location at `path`
    pub fn storage(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an error for an entry whose contents cannot be decoded
    pub fn malformed_entry(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedEntry {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
