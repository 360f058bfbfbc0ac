//! Page session: the context object built once per page load.
//!
//! Owns the grant broker and admission gate for that page and runs the
//! admission chain credential → subject → profile → grant. Dropping or
//! tearing down the session discards every grant it fetched.

use crate::backend::{ConsultBackend, UserProfile};
use crate::broker::{AccessGrant, AccessTokenBroker, DenialReason, GrantOutcome};
use crate::credential::CredentialStore;
use crate::gate::{AdmissionGate, AdmissionState, AdmissionView};
use crate::identity;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PageSession {
    store: CredentialStore,
    backend: Arc<dyn ConsultBackend>,
    broker: AccessTokenBroker,
    gate: AdmissionGate,
}

impl PageSession {
    pub fn new(store: CredentialStore, backend: Arc<dyn ConsultBackend>) -> Self {
        Self {
            broker: AccessTokenBroker::new(backend.clone()),
            gate: AdmissionGate::new(),
            store,
            backend,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    pub fn broker(&self) -> &AccessTokenBroker {
        &self.broker
    }

    pub fn admission(&self) -> AdmissionState {
        self.gate.state()
    }

    pub fn view(&self) -> AdmissionView {
        self.gate.view()
    }

    /// The grant, if admission has been granted.
    pub fn grant(&self) -> Option<AccessGrant> {
        match self.gate.state() {
            AdmissionState::Granted(grant) => Some(grant),
            _ => None,
        }
    }

    /// Run the admission chain and drive the gate to a terminal state.
    pub async fn check_admission(&self) -> AdmissionState {
        let ticket = self.gate.begin_check();
        let outcome = self.resolve_grant().await;
        self.gate.resolve(ticket, outcome)
    }

    async fn resolve_grant(&self) -> GrantOutcome {
        if self.broker.is_closed() {
            return GrantOutcome::Denied(DenialReason::SessionClosed);
        }

        let Some(credential) = self.store.load() else {
            debug!("No valid credential; admission denied");
            self.broker.invalidate();
            return GrantOutcome::Denied(DenialReason::NoCredential);
        };

        let Some(subject) = identity::get_subject_id(&credential) else {
            warn!("Credential carries no subject");
            self.broker.invalidate();
            return GrantOutcome::Denied(DenialReason::NoIdentity);
        };

        let profile = match self.backend.fetch_profile(&credential.raw_token, &subject).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "Profile lookup failed");
                return GrantOutcome::Denied(DenialReason::IdentityLookupFailed);
            }
        };
        self.cache_profile(&profile);

        let Some(document_number) = profile.document() else {
            warn!(user_id = %profile.id, "Profile has no document number");
            return GrantOutcome::Denied(DenialReason::IdentityLookupFailed);
        };

        self.broker
            .fetch_access_grant(&credential.raw_token, document_number)
            .await
    }

    fn cache_profile(&self, profile: &UserProfile) {
        let vault = self.store.vault();
        if let Err(err) = vault.set_profile(profile) {
            warn!(error = %err, "Failed to cache user profile");
        }
        if let Some(email) = profile.email.as_deref().filter(|e| !e.is_empty()) {
            if let Err(err) = vault.set_email(email) {
                warn!(error = %err, "Failed to cache user email");
            }
        }
    }

    /// Credential replaced (re-authentication): forget grants so the next
    /// check fetches afresh.
    pub fn credential_changed(&self) {
        self.broker.invalidate();
    }

    /// Clear the credential and every grant, leaving the gate denied.
    pub fn logout(&self) -> AdmissionState {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear session storage on logout");
        }
        self.broker.invalidate();
        info!("Logged out");
        self.gate.deny(DenialReason::NoCredential)
    }

    /// Page unload. Further checks are denied.
    pub fn teardown(&self) {
        self.broker.close();
        self.gate.deny(DenialReason::SessionClosed);
        debug!("Page session torn down");
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.broker.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AuthenticateResponse, GrantResponse};
    use crate::broker::BrokerState;
    use crate::gate::{LABEL_CHECKOUT, LABEL_START};
    use crate::{AuthError, AuthResult};
    use async_trait::async_trait;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use consult_storage::{MemoryStorage, OriginStorage, StorageKeys};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        document: Option<&'static str>,
        profile_fails: bool,
        grant: Option<&'static str>,
        profile_calls: AtomicUsize,
        grant_calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(document: Option<&'static str>, grant: Option<&'static str>) -> Self {
            Self {
                document,
                profile_fails: false,
                grant,
                profile_calls: AtomicUsize::new(0),
                grant_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConsultBackend for FakeBackend {
        async fn fetch_profile(&self, _: &str, subject: &str) -> AuthResult<UserProfile> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.profile_fails {
                return Err(AuthError::IdentityLookupFailed("HTTP 500".to_string()));
            }
            Ok(UserProfile {
                id: subject.to_string(),
                document_number: self.document.map(str::to_string),
                email: Some("patient@example.com".to_string()),
                name: None,
                extra: Default::default(),
            })
        }

        async fn fetch_access_grant(&self, _: &str, _: &str) -> AuthResult<GrantResponse> {
            self.grant_calls.fetch_add(1, Ordering::SeqCst);
            match self.grant {
                Some(token) => Ok(GrantResponse {
                    access_token: token.to_string(),
                }),
                None => Err(AuthError::GrantFetchFailed("HTTP 404".to_string())),
            }
        }

        async fn authenticate_by_code(&self, _: &str) -> AuthResult<AuthenticateResponse> {
            Err(AuthError::CodeExchangeFailed("unused".to_string()))
        }
    }

    fn jwt(sub: &str) -> String {
        format!(
            "h.{}.s",
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}"}}"#, sub))
        )
    }

    fn session(backend: FakeBackend) -> (Arc<MemoryStorage>, Arc<FakeBackend>, PageSession) {
        let storage = Arc::new(MemoryStorage::new());
        let backend = Arc::new(backend);
        let session = PageSession::new(CredentialStore::new(storage.clone()), backend.clone());
        (storage, backend, session)
    }

    #[tokio::test]
    async fn test_granted_chain_caches_profile() {
        let (storage, _, session) = session(FakeBackend::new(Some("12345678900"), Some("abc")));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();

        let state = session.check_admission().await;

        assert_eq!(state.grant().map(|g| g.token.as_str()), Some("abc"));
        assert_eq!(session.view().label, LABEL_START);
        assert!(storage.has(StorageKeys::USER_PROFILE).unwrap());
        assert_eq!(
            storage.get(StorageKeys::USER_EMAIL).unwrap().as_deref(),
            Some("patient@example.com")
        );
    }

    #[tokio::test]
    async fn test_opaque_token_is_denied_without_backend_calls() {
        let (_, backend, session) = session(FakeBackend::new(Some("1"), Some("abc")));
        session.credentials().save("opaque", 3600).unwrap();

        let state = session.check_admission().await;

        assert_eq!(state, AdmissionState::Denied(DenialReason::NoIdentity));
        assert_eq!(backend.profile_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_profile_failure_is_denied() {
        let mut backend = FakeBackend::new(Some("1"), Some("abc"));
        backend.profile_fails = true;
        let (_, backend, session) = session(backend);
        session.credentials().save(&jwt("u-1"), 3600).unwrap();

        let state = session.check_admission().await;

        assert_eq!(state, AdmissionState::Denied(DenialReason::IdentityLookupFailed));
        assert_eq!(backend.grant_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_document_is_denied() {
        let (_, _, session) = session(FakeBackend::new(None, Some("abc")));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();

        assert_eq!(
            session.check_admission().await,
            AdmissionState::Denied(DenialReason::IdentityLookupFailed)
        );
    }

    #[tokio::test]
    async fn test_grant_failure_renders_checkout() {
        let (_, _, session) = session(FakeBackend::new(Some("1"), None));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();

        session.check_admission().await;
        assert_eq!(session.view().label, LABEL_CHECKOUT);
    }

    #[tokio::test]
    async fn test_repeat_checks_reuse_grant() {
        let (_, backend, session) = session(FakeBackend::new(Some("1"), Some("abc")));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();

        session.check_admission().await;
        session.check_admission().await;

        assert_eq!(backend.grant_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_credential_discards_grant() {
        let (storage, backend, session) = session(FakeBackend::new(Some("1"), Some("abc")));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();
        session.check_admission().await;
        assert_eq!(session.broker().state("1"), BrokerState::Granted);

        storage.set(StorageKeys::TOKEN_EXPIRY, "1").unwrap();
        assert_eq!(
            session.check_admission().await,
            AdmissionState::Denied(DenialReason::NoCredential)
        );
        assert_eq!(session.broker().state("1"), BrokerState::Idle);

        session.credentials().save(&jwt("u-1"), 3600).unwrap();
        assert!(session.check_admission().await.is_granted());
        assert_eq!(backend.grant_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_logout_clears_storage_and_denies() {
        let (storage, _, session) = session(FakeBackend::new(Some("1"), Some("abc")));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();
        session.check_admission().await;

        let state = session.logout();

        assert_eq!(state, AdmissionState::Denied(DenialReason::NoCredential));
        assert!(storage.is_empty());
        assert!(session.grant().is_none());
    }

    #[tokio::test]
    async fn test_teardown_denies_further_checks() {
        let (_, backend, session) = session(FakeBackend::new(Some("1"), Some("abc")));
        session.credentials().save(&jwt("u-1"), 3600).unwrap();
        session.teardown();

        assert_eq!(
            session.check_admission().await,
            AdmissionState::Denied(DenialReason::SessionClosed)
        );
        assert_eq!(backend.profile_calls.load(Ordering::SeqCst), 0);
    }
}
