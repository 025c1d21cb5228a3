//! Bearer token attachment for outgoing calls

use super::transport::ApiRequest;
use simulador_core::CredentialStore;

/// Attaches the stored access token to every outgoing call
#[derive(Debug, Clone)]
pub struct RequestAugmenter {
    store: CredentialStore,
}

impl RequestAugmenter {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Add `Authorization: Bearer <token>` when a token is stored.
    /// Without one the request goes out untouched.
    pub fn augment(&self, request: ApiRequest) -> ApiRequest {
        match self.store.access_token() {
            Some(token) => request.with_bearer(&token),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulador_core::{MemoryStorage, Session, UserProfile};
    use std::sync::Arc;

    fn augmenter() -> (RequestAugmenter, CredentialStore) {
        let store = CredentialStore::new(Arc::new(MemoryStorage::new()));
        (RequestAugmenter::new(store.clone()), store)
    }

    #[test]
    fn test_attaches_stored_token() {
        let (augmenter, store) = augmenter();
        store
            .set(&Session::new(
                "T1",
                "R1",
                UserProfile {
                    id: "1".into(),
                    name: "Demo".into(),
                    email: "demo@simulador.com".into(),
                },
            ))
            .unwrap();

        let request = augmenter.augment(ApiRequest::get("/api/portafolio"));
        assert_eq!(request.bearer_token(), Some("T1"));
    }

    #[test]
    fn test_leaves_request_alone_without_token() {
        let (augmenter, _) = augmenter();

        let request = augmenter.augment(ApiRequest::get("/api/activos"));
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_picks_up_rotated_token() {
        let (augmenter, store) = augmenter();
        store.update_tokens("T1", "R1", None).unwrap();
        assert_eq!(
            augmenter.augment(ApiRequest::get("/x")).bearer_token(),
            Some("T1")
        );

        store.update_tokens("T2", "R2", None).unwrap();
        assert_eq!(
            augmenter.augment(ApiRequest::get("/x")).bearer_token(),
            Some("T2")
        );
    }
}
