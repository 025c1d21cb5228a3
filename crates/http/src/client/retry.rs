//! Single replay of a call that failed with an expired token

use super::error::{ClientError, RenewalError};
use super::transport::{ApiRequest, ApiResponse, Transport};
use std::sync::Arc;
use tracing::debug;

/// An augmented outgoing call and whether it has already been replayed.
///
/// Each attempt is a fresh value; the marker is never flipped in place.
#[derive(Debug, Clone)]
pub struct OriginalRequest {
    request: ApiRequest,
    retried: bool,
}

impl OriginalRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// The replay attempt: same call, new bearer token, marked retried
    pub fn into_retry(self, token: &str) -> Self {
        Self {
            request: self.request.with_bearer(token),
            retried: true,
        }
    }
}

/// Reissues a call once a renewal has concluded
#[derive(Clone)]
pub struct RetryDispatcher {
    transport: Arc<dyn Transport>,
}

impl RetryDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Replay `original` with the renewed token, or forward the renewal
    /// failure without touching the network.
    ///
    /// Returns the replay attempt together with whatever the transport
    /// produced for it.
    pub async fn dispatch(
        &self,
        original: OriginalRequest,
        renewal: Result<String, RenewalError>,
    ) -> Result<(OriginalRequest, ApiResponse), ClientError> {
        let token = renewal?;

        if original.is_retried() {
            return Err(ClientError::RetryExhausted(format!(
                "{} {} was already replayed",
                original.request.method, original.request.path
            )));
        }

        let replay = original.into_retry(&token);
        debug!(
            method = %replay.request.method,
            path = %replay.request.path,
            "Replaying request with renewed token"
        );

        let response = self.transport.send(replay.request.clone()).await?;
        Ok((replay, response))
    }
}
