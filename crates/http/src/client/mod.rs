//! Session-aware HTTP client
//!
//! Every call runs through the same pipeline: the stored access token is
//! attached, the response is classified, and an expired token on a
//! protected call is renewed (once, shared with any concurrent failures)
//! before the call is replayed a single time.

pub mod augment;
pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod refresh;
pub mod retry;
pub mod transport;

pub use config::{ClientConfig, EndpointConfig};
pub use error::{ClientError, RenewalError, TransportError};
pub use refresh::{LoggedTeardown, SessionTeardown, TokenRenewer};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

use augment::RequestAugmenter;
use classify::{AuthEndpoints, Classification, FailureClassifier};
use refresh::{HttpRenewer, RefreshCoordinator};
use reqwest::{Method, StatusCode};
use retry::{OriginalRequest, RetryDispatcher};
use serde::Serialize;
use serde::de::DeserializeOwned;
use simulador_core::{CredentialStore, MemoryStorage, Session, SessionStorage};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Simulador API client bound to one session
#[derive(Clone)]
pub struct SessionClient {
    base_url: String,
    endpoints: EndpointConfig,
    store: CredentialStore,
    transport: Arc<dyn Transport>,
    augmenter: RequestAugmenter,
    classifier: FailureClassifier,
    coordinator: Arc<RefreshCoordinator>,
    dispatcher: RetryDispatcher,
}

impl SessionClient {
    /// Create a client with default configuration and in-memory storage
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credential store backing this client
    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    /// Snapshot of the stored session
    pub fn session(&self) -> Session {
        self.store.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get().is_authenticated()
    }

    /// Create a request for `path`
    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, path)
    }

    /// Send a call through the authentication pipeline.
    ///
    /// Non-2xx answers become errors carrying the status and body. A 401 on
    /// a protected call is recovered by renewal and one replay when possible.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let original = OriginalRequest::new(self.augmenter.augment(request));
        let response = self.transport.send(original.request().clone()).await?;

        match self.classifier.classify(&response, &original) {
            Classification::Ok => Ok(response),
            Classification::OtherError => Err(self.surface(&original, &response)),
            Classification::Unauthorized => {
                debug!(
                    method = %original.request().method,
                    path = %original.request().path,
                    "Access token rejected, renewing"
                );
                let stale = original.request().bearer_token().map(str::to_owned);
                let renewal = self.coordinator.ensure_fresh_token(stale.as_deref()).await;

                let (replay, response) = self.dispatcher.dispatch(original, renewal).await?;
                match self.classifier.classify(&response, &replay) {
                    Classification::Ok => Ok(response),
                    Classification::Unauthorized | Classification::OtherError => {
                        Err(self.surface(&replay, &response))
                    }
                }
            }
        }
    }

    /// Send a call and decode its JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::POST, path)
            .json(serde_json::to_value(body)?);
        self.execute(request).await
    }

    /// Error handed to the caller for a response the pipeline does not recover
    fn surface(&self, attempt: &OriginalRequest, response: &ApiResponse) -> ClientError {
        let message = response.text();
        if self.classifier.is_auth_endpoint(&attempt.request().path) {
            ClientError::AuthEndpoint {
                status: response.status.as_u16(),
                message,
            }
        } else if attempt.is_retried() && response.status == StatusCode::UNAUTHORIZED {
            ClientError::RetryExhausted(message)
        } else {
            ClientError::from_status(response.status, message)
        }
    }
}

/// Builder for SessionClient
#[derive(Default)]
pub struct SessionClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    endpoints: Option<EndpointConfig>,
    storage: Option<Arc<dyn SessionStorage>>,
    transport: Option<Arc<dyn Transport>>,
    renewer: Option<Arc<dyn TokenRenewer>>,
    teardown: Option<Arc<dyn SessionTeardown>>,
}

impl SessionClientBuilder {
    /// Apply every setting from a loaded configuration
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.base_url = Some(config.base_url.clone());
        self.timeout = config.timeout();
        self.user_agent = Some(config.user_agent.clone());
        self.endpoints = Some(config.endpoints.clone());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Storage holding the session; defaults to in-memory
    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Transport for every call; defaults to reqwest
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Renewal strategy; defaults to the refresh endpoint over the transport
    pub fn renewer(mut self, renewer: Arc<dyn TokenRenewer>) -> Self {
        self.renewer = Some(renewer);
        self
    }

    /// Action taken when the session cannot be renewed
    pub fn teardown(mut self, teardown: Arc<dyn SessionTeardown>) -> Self {
        self.teardown = Some(teardown);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SessionClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoints = self.endpoints.unwrap_or_default();

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                base_url.clone(),
                self.timeout,
                self.user_agent.as_deref(),
            )?),
        };
        let storage: Arc<dyn SessionStorage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::new()),
        };
        let renewer: Arc<dyn TokenRenewer> = match self.renewer {
            Some(renewer) => renewer,
            None => Arc::new(HttpRenewer::new(
                transport.clone(),
                endpoints.refresh.clone(),
            )),
        };
        let teardown: Arc<dyn SessionTeardown> = match self.teardown {
            Some(teardown) => teardown,
            None => Arc::new(LoggedTeardown),
        };

        let store = CredentialStore::new(storage);
        let classifier =
            FailureClassifier::new(AuthEndpoints::new(endpoints.renewal_exempt()));

        Ok(SessionClient {
            base_url,
            augmenter: RequestAugmenter::new(store.clone()),
            classifier,
            coordinator: Arc::new(RefreshCoordinator::new(store.clone(), renewer, teardown)),
            dispatcher: RetryDispatcher::new(transport.clone()),
            endpoints,
            store,
            transport,
        })
    }
}
