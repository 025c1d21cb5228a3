//! Simulador HTTP client
//!
//! Attaches the session's bearer token to every call, renews an expired
//! access token with a single shared refresh request, and replays the calls
//! that failed while it was stale.

pub mod client;
pub mod types;

pub use client::{
    ApiRequest, ApiResponse, ClientConfig, ClientError, EndpointConfig, RenewalError,
    SessionClient, SessionClientBuilder, SessionTeardown, Transport, TransportError,
};
