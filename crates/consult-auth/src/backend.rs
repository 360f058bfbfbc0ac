//! Backend collaborators consumed by the admission chain.

use crate::AuthResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Profile returned by the profile-by-id lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Remaining profile fields, kept so the cached copy is complete.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Document number with surrounding whitespace removed, if non-empty.
    pub fn document(&self) -> Option<&str> {
        self.document_number
            .as_deref()
            .map(str::trim)
            .filter(|doc| !doc.is_empty())
    }
}

/// Body of the access-grant-by-document lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrantResponse {
    pub access_token: String,
}

/// Body of the authenticate-by-code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub need_more_information: bool,
    #[serde(default)]
    pub email: Option<String>,
}

/// REST collaborators, treated as black boxes.
#[async_trait]
pub trait ConsultBackend: Send + Sync {
    /// Look up the profile for `subject` using the session `credential`.
    async fn fetch_profile(&self, credential: &str, subject: &str) -> AuthResult<UserProfile>;

    /// Request the service-specific access grant for `document_number`.
    async fn fetch_access_grant(
        &self,
        credential: &str,
        document_number: &str,
    ) -> AuthResult<GrantResponse>;

    /// Exchange a one-time authentication code for a session credential.
    async fn authenticate_by_code(&self, code: &str) -> AuthResult<AuthenticateResponse>;
}
