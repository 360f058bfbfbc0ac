//! Authentication and admission error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential missing, expired, or malformed
    #[error("Credential invalid: {0}")]
    CredentialInvalid(String),

    /// Profile lookup for the credential's subject failed
    #[error("Identity lookup failed: {0}")]
    IdentityLookupFailed(String),

    /// Access grant request failed or was refused
    #[error("Access grant fetch failed: {0}")]
    GrantFetchFailed(String),

    /// Authenticate-by-code exchange was rejected
    #[error("Code exchange failed: {0}")]
    CodeExchangeFailed(String),

    /// Invalid state transition in the admission FSM
    #[error("Invalid admission state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] consult_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Returns true if this error is transient (connection failure, timeout, 5xx).
    ///
    /// Only used for log classification: admission never retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
