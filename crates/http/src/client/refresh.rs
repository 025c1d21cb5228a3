//! Single-flight token renewal
//!
//! When several protected calls fail with an expired access token at the
//! same time, exactly one of them (the leader) talks to the refresh
//! endpoint. Everyone arriving while that renewal is outstanding is queued
//! and released, in arrival order, with the leader's outcome.
//!
//! On failure the credential store is cleared before any caller is released
//! and the teardown collaborator runs once per failed renewal, no matter
//! how many callers were queued.

use super::error::RenewalError;
use super::transport::{ApiRequest, Transport};
use crate::types::RefreshResponse;
use async_trait::async_trait;
use simulador_core::{CredentialStore, UserProfile};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Tokens produced by a successful renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Option<UserProfile>,
}

/// Exchanges a refresh token for a new token pair
#[async_trait]
pub trait TokenRenewer: Send + Sync {
    async fn renew(&self, refresh_token: &str) -> Result<RenewedTokens, RenewalError>;
}

/// Renewal over the refresh endpoint.
///
/// The call goes straight to the transport: it carries no bearer token and
/// its response is never classified, so a rejected refresh cannot recurse.
pub struct HttpRenewer {
    transport: Arc<dyn Transport>,
    path: String,
}

impl HttpRenewer {
    pub fn new(transport: Arc<dyn Transport>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }
}

#[async_trait]
impl TokenRenewer for HttpRenewer {
    async fn renew(&self, refresh_token: &str) -> Result<RenewedTokens, RenewalError> {
        let request = ApiRequest::post(self.path.as_str())
            .json(serde_json::json!({ "refresh_token": refresh_token }));

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RenewalError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(RenewalError::Rejected {
                status: response.status.as_u16(),
                message: response.text(),
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RenewalError::InvalidResponse(e.to_string()))?;

        Ok(RenewedTokens {
            user: body.profile(),
            access_token: body.access_token,
            refresh_token: body.refresh_token,
        })
    }
}

/// Returns the user to the unauthenticated entry point after the session is
/// lost. Invoked at most once per failed renewal.
pub trait SessionTeardown: Send + Sync {
    fn abandon_session(&self);
}

/// Teardown that only records the event
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggedTeardown;

impl SessionTeardown for LoggedTeardown {
    fn abandon_session(&self) {
        warn!("Session abandoned, sign in again to continue");
    }
}

type Outcome = Result<String, RenewalError>;

/// A caller parked behind the renewal in flight. The sender is consumed by
/// `send`, so each one is completed at most once.
type PendingCall = oneshot::Sender<Outcome>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<PendingCall>,
}

enum Turn {
    Lead,
    Wait(oneshot::Receiver<Outcome>),
    AlreadyRotated(String),
}

/// Owner of the renewal state; see the module docs
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: CredentialStore,
    renewer: Arc<dyn TokenRenewer>,
    teardown: Arc<dyn SessionTeardown>,
}

impl RefreshCoordinator {
    pub fn new(
        store: CredentialStore,
        renewer: Arc<dyn TokenRenewer>,
        teardown: Arc<dyn SessionTeardown>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            store,
            renewer,
            teardown,
        }
    }

    /// Obtain an access token to replace `stale_token`, the one a call was
    /// rejected with.
    ///
    /// If the store already holds a different token and no renewal is in
    /// flight, a renewal finished after that call was sent and its token is
    /// returned as-is. Otherwise the caller either leads a new renewal or
    /// queues behind the one in flight.
    pub async fn ensure_fresh_token(&self, stale_token: Option<&str>) -> Outcome {
        let turn = {
            let mut state = self.state();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                debug!(
                    position = state.waiters.len(),
                    "Renewal in flight, queueing caller"
                );
                Turn::Wait(rx)
            } else if let Some(current) = self.rotated_since(stale_token) {
                Turn::AlreadyRotated(current)
            } else {
                // Claimed before the first await: no second leader can start.
                state.in_flight = true;
                Turn::Lead
            }
        };

        match turn {
            Turn::Lead => self.lead().await,
            Turn::Wait(rx) => rx.await.unwrap_or(Err(RenewalError::Interrupted)),
            Turn::AlreadyRotated(token) => {
                debug!("Access token already renewed, reusing it");
                Ok(token)
            }
        }
    }

    /// True while a renewal call is outstanding
    pub fn is_renewing(&self) -> bool {
        self.state().in_flight
    }

    /// Number of callers queued behind the renewal in flight
    pub fn queued(&self) -> usize {
        self.state().waiters.len()
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rotated_since(&self, stale_token: Option<&str>) -> Option<String> {
        let current = self.store.access_token()?;
        (stale_token != Some(current.as_str())).then_some(current)
    }

    async fn lead(&self) -> Outcome {
        let mut flight = Flight {
            coordinator: self,
            concluded: false,
        };

        let outcome = self.renew().await;

        match &outcome {
            Ok(_) => info!("Access token renewed"),
            Err(err) => {
                warn!(error = %err, "Token renewal failed, clearing session");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear credentials after renewal failure");
                }
            }
        }

        flight.conclude(&outcome);

        if outcome.is_err() {
            self.teardown.abandon_session();
        }

        outcome
    }

    async fn renew(&self) -> Outcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("No refresh token stored, skipping renewal call");
            return Err(RenewalError::MissingRefreshToken);
        };

        let renewed = self.renewer.renew(&refresh_token).await?;

        self.store
            .update_tokens(
                &renewed.access_token,
                &renewed.refresh_token,
                renewed.user.as_ref(),
            )
            .map_err(|e| RenewalError::Storage(e.to_string()))?;

        Ok(renewed.access_token)
    }

    /// End the flight and hand `outcome` to every queued caller, oldest
    /// first. The queue is emptied in the same critical section that clears
    /// the in-flight flag.
    fn release(&self, outcome: &Outcome) {
        let waiters = {
            let mut state = self.state();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        if !waiters.is_empty() {
            debug!(waiters = waiters.len(), "Releasing queued callers");
        }

        for waiter in waiters {
            // A waiter that gave up has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Marks the leader's renewal. If the leader is dropped before concluding,
/// queued callers are released with [`RenewalError::Interrupted`].
struct Flight<'a> {
    coordinator: &'a RefreshCoordinator,
    concluded: bool,
}

impl Flight<'_> {
    fn conclude(&mut self, outcome: &Outcome) {
        self.concluded = true;
        self.coordinator.release(outcome);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.concluded {
            warn!("Renewal abandoned by its caller, releasing waiters");
            self.coordinator.release(&Err(RenewalError::Interrupted));
        }
    }
}
