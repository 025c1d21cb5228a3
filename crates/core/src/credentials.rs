//! Credential store: the session mapped onto storage keys

use crate::{CoreError, CoreResult, Session, SessionStorage, UserProfile};
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "token";
/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the JSON-encoded user profile
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Reads and writes the [`Session`] held in a [`SessionStorage`].
///
/// Cloning is cheap and every clone observes the same storage.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn SessionStorage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Current session. A stored profile that cannot be decoded is dropped
    /// from storage and reported as absent.
    pub fn get(&self) -> Session {
        Session {
            access_token: self.storage.get_item(ACCESS_TOKEN_KEY),
            refresh_token: self.storage.get_item(REFRESH_TOKEN_KEY),
            user: self.user(),
        }
    }

    /// Current access token, if any
    pub fn access_token(&self) -> Option<String> {
        self.storage.get_item(ACCESS_TOKEN_KEY)
    }

    /// Current refresh token, if any
    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get_item(REFRESH_TOKEN_KEY)
    }

    /// Replace the stored session. Absent fields are removed.
    pub fn set(&self, session: &Session) -> CoreResult<()> {
        self.put(ACCESS_TOKEN_KEY, session.access_token.as_deref())?;
        self.put(REFRESH_TOKEN_KEY, session.refresh_token.as_deref())?;
        match &session.user {
            Some(user) => self.set_user(user)?,
            None => self.storage.remove_item(USER_KEY)?,
        }
        debug!(authenticated = session.is_authenticated(), "Session stored");
        Ok(())
    }

    /// Store a renewed token pair, keeping the current profile unless a fresh
    /// one is supplied
    pub fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        user: Option<&UserProfile>,
    ) -> CoreResult<()> {
        self.storage.set_item(ACCESS_TOKEN_KEY, access_token)?;
        self.storage.set_item(REFRESH_TOKEN_KEY, refresh_token)?;
        if let Some(user) = user {
            self.set_user(user)?;
        }
        Ok(())
    }

    pub fn set_user(&self, user: &UserProfile) -> CoreResult<()> {
        let encoded = serde_json::to_string(user)?;
        self.storage.set_item(USER_KEY, &encoded)
    }

    /// Remove the access token, refresh token and profile in one step
    pub fn clear(&self) -> CoreResult<()> {
        self.storage.remove_items(&SESSION_KEYS)?;
        debug!("Session cleared");
        Ok(())
    }

    fn put(&self, key: &str, value: Option<&str>) -> CoreResult<()> {
        match value {
            Some(value) => self.storage.set_item(key, value),
            None => self.storage.remove_item(key),
        }
    }

    fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get_item(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                let err = CoreError::malformed_entry(USER_KEY, e.to_string());
                warn!(error = %err, "Discarding stored user profile");
                if let Err(e) = self.storage.remove_item(USER_KEY) {
                    warn!(error = %e, "Failed to remove malformed user profile");
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn profile() -> UserProfile {
        UserProfile {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            name: "Demo".to_string(),
            email: "demo@simulador.com".to_string(),
        }
    }

    fn store() -> (CredentialStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (CredentialStore::new(storage.clone()), storage)
    }

    #[test]
    fn test_set_and_get_session() {
        let (store, storage) = store();
        let session = Session::new("access", "refresh", profile());

        store.set(&session).unwrap();

        assert_eq!(store.get(), session);
        assert_eq!(storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("access"));
        assert_eq!(
            storage.get_item(REFRESH_TOKEN_KEY).as_deref(),
            Some("refresh")
        );
    }

    #[test]
    fn test_set_removes_absent_fields() {
        let (store, _) = store();
        store.set(&Session::new("access", "refresh", profile())).unwrap();

        store
            .set(&Session {
                access_token: Some("only-access".to_string()),
                ..Session::default()
            })
            .unwrap();

        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("only-access"));
        assert_eq!(session.refresh_token, None);
        assert_eq!(session.user, None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, _) = store();
        store.set(&Session::new("access", "refresh", profile())).unwrap();

        store.clear().unwrap();

        assert!(store.get().is_empty());
    }

    #[test]
    fn test_update_tokens_keeps_profile() {
        let (store, _) = store();
        store.set(&Session::new("a1", "r1", profile())).unwrap();

        store.update_tokens("a2", "r2", None).unwrap();

        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("a2"));
        assert_eq!(session.refresh_token.as_deref(), Some("r2"));
        assert_eq!(session.user, Some(profile()));
    }

    #[test]
    fn test_malformed_profile_is_discarded() {
        let (store, storage) = store();
        storage.set_item(ACCESS_TOKEN_KEY, "access").unwrap();
        storage.set_item(USER_KEY, "{not json").unwrap();

        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("access"));
        assert_eq!(session.user, None);
        assert_eq!(storage.get_item(USER_KEY), None);
    }
}
