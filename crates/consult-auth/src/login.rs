//! Authenticate-by-code login.

use crate::backend::ConsultBackend;
use crate::credential::{Credential, CredentialStore};
use crate::{AuthError, AuthResult};
use chrono::Utc;
use consult_storage::SignupStatus;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Account is ready to use.
    Complete(Credential),
    /// Backend wants more profile data before the account is usable.
    NeedsMoreInformation(Credential),
}

impl LoginOutcome {
    pub fn credential(&self) -> &Credential {
        match self {
            LoginOutcome::Complete(credential) | LoginOutcome::NeedsMoreInformation(credential) => {
                credential
            }
        }
    }
}

pub struct LoginFlow {
    store: CredentialStore,
    backend: Arc<dyn ConsultBackend>,
    default_ttl_secs: i64,
}

impl LoginFlow {
    pub fn new(store: CredentialStore, backend: Arc<dyn ConsultBackend>, default_ttl_secs: i64) -> Self {
        Self {
            store,
            backend,
            default_ttl_secs,
        }
    }

    /// Exchange `code` for a session credential and store it.
    ///
    /// On failure the previously stored credential is left untouched.
    pub async fn authenticate_with_code(&self, code: &str) -> AuthResult<LoginOutcome> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::CodeExchangeFailed("empty code".to_string()));
        }

        let response = self.backend.authenticate_by_code(code).await?;
        if response.token.trim().is_empty() {
            return Err(AuthError::CodeExchangeFailed(
                "response carried no token".to_string(),
            ));
        }

        let ttl_secs = response
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(self.default_ttl_secs);
        let credential = self.store.save(&response.token, ttl_secs)?;

        let vault = self.store.vault();
        if let Some(email) = response.email.as_deref().filter(|e| !e.is_empty()) {
            if let Err(err) = vault.set_email(email) {
                warn!(error = %err, "Failed to cache email after login");
            }
        }
        let status = SignupStatus {
            need_more_information: response.need_more_information,
            recorded_at: Utc::now().to_rfc3339(),
        };
        if let Err(err) = vault.set_signup_status(&status) {
            warn!(error = %err, "Failed to cache signup status");
        }

        info!(
            ttl_secs,
            need_more_information = response.need_more_information,
            "Authenticated by code"
        );

        Ok(if response.need_more_information {
            LoginOutcome::NeedsMoreInformation(credential)
        } else {
            LoginOutcome::Complete(credential)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AuthenticateResponse, GrantResponse, UserProfile};
    use consult_storage::MemoryStorage;

    struct CodeBackend {
        response: Option<AuthenticateResponse>,
    }

    #[async_trait::async_trait]
    impl ConsultBackend for CodeBackend {
        async fn fetch_profile(&self, _: &str, _: &str) -> AuthResult<UserProfile> {
            Err(AuthError::IdentityLookupFailed("unused".to_string()))
        }

        async fn fetch_access_grant(&self, _: &str, _: &str) -> AuthResult<GrantResponse> {
            Err(AuthError::GrantFetchFailed("unused".to_string()))
        }

        async fn authenticate_by_code(&self, _: &str) -> AuthResult<AuthenticateResponse> {
            self.response
                .clone()
                .ok_or_else(|| AuthError::CodeExchangeFailed("HTTP 401".to_string()))
        }
    }

    fn flow(response: Option<AuthenticateResponse>) -> (CredentialStore, LoginFlow) {
        let store = CredentialStore::new(Arc::new(MemoryStorage::new()));
        let flow = LoginFlow::new(store.clone(), Arc::new(CodeBackend { response }), 3600);
        (store, flow)
    }

    #[tokio::test]
    async fn test_successful_exchange_stores_credential() {
        let (store, flow) = flow(Some(AuthenticateResponse {
            token: "fresh".to_string(),
            expires_in: Some(120),
            need_more_information: false,
            email: Some("a@b.c".to_string()),
        }));

        let outcome = flow.authenticate_with_code("123456").await.unwrap();

        assert!(matches!(outcome, LoginOutcome::Complete(_)));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.raw_token, "fresh");
        let ttl = loaded.expires_at - Utc::now();
        assert!(ttl.num_seconds() <= 120 && ttl.num_seconds() > 100);
        assert_eq!(store.vault().email().unwrap().as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_needs_more_information_is_reported_and_cached() {
        let (store, flow) = flow(Some(AuthenticateResponse {
            token: "fresh".to_string(),
            expires_in: None,
            need_more_information: true,
            email: None,
        }));

        let outcome = flow.authenticate_with_code("123456").await.unwrap();

        assert!(matches!(outcome, LoginOutcome::NeedsMoreInformation(_)));
        let status = store.vault().signup_status().unwrap().unwrap();
        assert!(status.need_more_information);
        let ttl = outcome.credential().expires_at - Utc::now();
        assert!(ttl.num_seconds() > 3500);
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_previous_credential() {
        let (store, flow) = flow(None);
        store.save("previous", 3600).unwrap();

        assert!(flow.authenticate_with_code("bad").await.is_err());
        assert_eq!(store.load().unwrap().raw_token, "previous");
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_rejected() {
        let (store, flow) = flow(Some(AuthenticateResponse {
            token: "t".to_string(),
            expires_in: Some(i64::MAX),
            need_more_information: false,
            email: None,
        }));
        store.save("previous", 3600).unwrap();

        assert!(matches!(
            flow.authenticate_with_code("123456").await,
            Err(AuthError::CredentialInvalid(_))
        ));
        assert_eq!(store.load().unwrap().raw_token, "previous");
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected() {
        let (_, flow) = flow(None);
        assert!(matches!(
            flow.authenticate_with_code("  ").await,
            Err(AuthError::CodeExchangeFailed(_))
        ));
    }
}
