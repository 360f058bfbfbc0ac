//! Access token broker.
//!
//! Fetches the ephemeral, service-specific access grant at most once per
//! identity for the life of a page. Concurrent callers share one in-flight
//! request and all observe the same outcome. A denial sticks until the
//! broker is invalidated or a new page session is built.
//!
//! Each fetch runs on its own task so it completes even when every caller
//! has gone away; late results are kept in the flight table and simply go
//! unread.

use crate::backend::ConsultBackend;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ephemeral grant required by the consultation widget. Never persisted.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub token: String,
    pub fetched_at: DateTime<Utc>,
}

impl fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGrant")
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Why admission was refused. Every reason renders the same checkout
/// prompt; the distinction exists for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No valid credential in storage.
    NoCredential,
    /// Credential payload carries no subject.
    NoIdentity,
    /// Profile lookup failed or returned no document number.
    IdentityLookupFailed,
    /// Grant request failed or was refused.
    GrantFetchFailed,
    /// The page session was torn down.
    SessionClosed,
}

/// Result of a grant fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted(AccessGrant),
    Denied(DenialReason),
}

impl GrantOutcome {
    pub fn grant(&self) -> Option<&AccessGrant> {
        match self {
            GrantOutcome::Granted(grant) => Some(grant),
            GrantOutcome::Denied(_) => None,
        }
    }
}

/// Per-identity broker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Idle,
    Pending,
    Granted,
    Denied,
}

type Flight = Shared<BoxFuture<'static, GrantOutcome>>;

/// Single-flight access grant fetcher, scoped to one page session.
pub struct AccessTokenBroker {
    backend: Arc<dyn ConsultBackend>,
    flights: Mutex<HashMap<String, Flight>>,
    closed: AtomicBool,
}

impl AccessTokenBroker {
    pub fn new(backend: Arc<dyn ConsultBackend>) -> Self {
        Self {
            backend,
            flights: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Fetch (or join the fetch of) the grant for `document_number`.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn fetch_access_grant(&self, credential: &str, document_number: &str) -> GrantOutcome {
        let flight = {
            let mut flights = self.flights.lock();
            if self.closed.load(Ordering::SeqCst) {
                return GrantOutcome::Denied(DenialReason::SessionClosed);
            }
            match flights.get(document_number) {
                Some(flight) => {
                    debug!("Joining existing access grant fetch");
                    flight.clone()
                }
                None => {
                    let flight = self.start_flight(credential.to_string(), document_number.to_string());
                    flights.insert(document_number.to_string(), flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    fn start_flight(&self, credential: String, document_number: String) -> Flight {
        let backend = self.backend.clone();
        let task = tokio::spawn(async move {
            match backend.fetch_access_grant(&credential, &document_number).await {
                Ok(response) if !response.access_token.trim().is_empty() => {
                    info!("Access grant issued");
                    GrantOutcome::Granted(AccessGrant {
                        token: response.access_token.trim().to_string(),
                        fetched_at: Utc::now(),
                    })
                }
                Ok(_) => {
                    warn!("Access grant response carried an empty token");
                    GrantOutcome::Denied(DenialReason::GrantFetchFailed)
                }
                Err(err) => {
                    warn!(error = %err, transient = err.is_transient(), "Access grant fetch failed");
                    GrantOutcome::Denied(DenialReason::GrantFetchFailed)
                }
            }
        });

        async move {
            task.await.unwrap_or_else(|err| {
                warn!(error = %err, "Access grant task did not complete");
                GrantOutcome::Denied(DenialReason::GrantFetchFailed)
            })
        }
        .boxed()
        .shared()
    }

    /// Current state for `document_number`.
    pub fn state(&self, document_number: &str) -> BrokerState {
        let flights = self.flights.lock();
        match flights.get(document_number).map(|flight| flight.peek()) {
            None => BrokerState::Idle,
            Some(None) => BrokerState::Pending,
            Some(Some(GrantOutcome::Granted(_))) => BrokerState::Granted,
            Some(Some(GrantOutcome::Denied(_))) => BrokerState::Denied,
        }
    }

    /// Forget every fetched or pending grant (credential invalidated).
    /// In-flight requests finish in the background and are discarded.
    pub fn invalidate(&self) {
        let mut flights = self.flights.lock();
        if !flights.is_empty() {
            debug!(count = flights.len(), "Discarding access grants");
        }
        flights.clear();
    }

    /// Invalidate and refuse all further fetches (page unload).
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.invalidate();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AuthenticateResponse, GrantResponse, UserProfile};
    use crate::{AuthError, AuthResult};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct SlowGrantBackend {
        calls: AtomicUsize,
        delay: Duration,
        token: Option<&'static str>,
    }

    impl SlowGrantBackend {
        fn new(token: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(50),
                token,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConsultBackend for SlowGrantBackend {
        async fn fetch_profile(&self, _: &str, _: &str) -> AuthResult<UserProfile> {
            Err(AuthError::IdentityLookupFailed("unused".to_string()))
        }

        async fn fetch_access_grant(&self, _: &str, _: &str) -> AuthResult<GrantResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.token {
                Some(token) => Ok(GrantResponse {
                    access_token: token.to_string(),
                }),
                None => Err(AuthError::GrantFetchFailed("HTTP 403".to_string())),
            }
        }

        async fn authenticate_by_code(&self, _: &str) -> AuthResult<AuthenticateResponse> {
            Err(AuthError::CodeExchangeFailed("unused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_backend_call() {
        let backend = SlowGrantBackend::new(Some("abc"));
        let broker = Arc::new(AccessTokenBroker::new(backend.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let broker = broker.clone();
                tokio::spawn(async move { broker.fetch_access_grant("cred", "12345678900").await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(backend.calls(), 1);
        assert!(outcomes.iter().all(|o| o == &outcomes[0]));
        assert_eq!(outcomes[0].grant().map(|g| g.token.as_str()), Some("abc"));
    }

    #[tokio::test]
    async fn test_state_moves_from_idle_to_pending_to_granted() {
        let backend = SlowGrantBackend::new(Some("abc"));
        let broker = Arc::new(AccessTokenBroker::new(backend));
        assert_eq!(broker.state("doc"), BrokerState::Idle);

        let task = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.fetch_access_grant("cred", "doc").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(broker.state("doc"), BrokerState::Pending);

        task.await.unwrap();
        assert_eq!(broker.state("doc"), BrokerState::Granted);
    }

    #[tokio::test]
    async fn test_denial_is_not_retried_within_page_life() {
        let backend = SlowGrantBackend::new(None);
        let broker = AccessTokenBroker::new(backend.clone());

        let first = broker.fetch_access_grant("cred", "doc").await;
        let second = broker.fetch_access_grant("cred", "doc").await;

        assert_eq!(first, GrantOutcome::Denied(DenialReason::GrantFetchFailed));
        assert_eq!(second, first);
        assert_eq!(backend.calls(), 1);
        assert_eq!(broker.state("doc"), BrokerState::Denied);
    }

    #[tokio::test]
    async fn test_empty_token_is_a_denial() {
        let backend = SlowGrantBackend::new(Some("   "));
        let broker = AccessTokenBroker::new(backend);

        assert_eq!(
            broker.fetch_access_grant("cred", "doc").await,
            GrantOutcome::Denied(DenialReason::GrantFetchFailed)
        );
    }

    #[tokio::test]
    async fn test_invalidate_allows_a_fresh_fetch() {
        let backend = SlowGrantBackend::new(Some("abc"));
        let broker = AccessTokenBroker::new(backend.clone());

        broker.fetch_access_grant("cred", "doc").await;
        broker.invalidate();
        assert_eq!(broker.state("doc"), BrokerState::Idle);

        broker.fetch_access_grant("cred", "doc").await;
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_closed_broker_denies_without_calling_backend() {
        let backend = SlowGrantBackend::new(Some("abc"));
        let broker = AccessTokenBroker::new(backend.clone());
        broker.close();

        assert_eq!(
            broker.fetch_access_grant("cred", "doc").await,
            GrantOutcome::Denied(DenialReason::SessionClosed)
        );
        assert_eq!(backend.calls(), 0);
        assert!(broker.is_closed());
    }

    #[tokio::test]
    async fn test_abandoned_fetch_still_completes() {
        let backend = SlowGrantBackend::new(Some("abc"));
        let broker = Arc::new(AccessTokenBroker::new(backend.clone()));

        let requester = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.fetch_access_grant("cred", "doc").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        requester.abort();

        // A later caller joins the original flight rather than starting another.
        let outcome = broker.fetch_access_grant("cred", "doc").await;
        assert!(outcome.grant().is_some());
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_grant_debug_hides_token() {
        let grant = AccessGrant {
            token: "very-secret".to_string(),
            fetched_at: Utc::now(),
        };
        assert!(!format!("{:?}", grant).contains("very-secret"));
    }
}
