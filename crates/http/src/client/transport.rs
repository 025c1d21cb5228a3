//! Request/response values and the transport that carries them

use super::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

/// An outgoing call, relative to the client's base URL.
///
/// Requests are plain values so a failed call can be replayed verbatim.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any previous value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Copy of this request carrying `token` as its bearer credential
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.clone();
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(header::AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("Access token is not a valid header value, sending without it");
                request.headers.remove(header::AUTHORIZATION);
            }
        }
        request
    }

    /// Token from the `Authorization: Bearer` header, if present
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }
}

/// A completed response with its body fully read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, falling back to the status line when it is empty
    pub fn text(&self) -> String {
        if self.body.is_empty() {
            self.status.to_string()
        } else {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }
}

/// Issues calls on behalf of the session client.
///
/// Implementations deliver the request and hand back whatever the server
/// answered; status codes are never interpreted here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Transport over a reqwest client
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport with optional timeout and user agent
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        user_agent: Option<&str>,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut builder =
            ClientBuilder::new().user_agent(user_agent.unwrap_or("simulador-client/0.1.0"));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        trace!(method = %request.method, %url, "Sending request");

        let mut builder = self.client.request(request.method, url).headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
