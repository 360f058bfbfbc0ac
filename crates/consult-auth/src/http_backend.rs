//! REST implementation of [`ConsultBackend`].

use crate::backend::{AuthenticateResponse, ConsultBackend, GrantResponse, UserProfile};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Backend client over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    api_url: Url,
}

impl HttpBackend {
    /// Create a client for the API rooted at `api_url`.
    pub fn new(api_url: &str) -> AuthResult<Self> {
        let mut api_url = Url::parse(api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            api_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> AuthResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn profile_url(&self, subject: &str) -> AuthResult<Url> {
        self.endpoint(&["users", subject])
    }

    pub(crate) fn grant_url(&self, document_number: &str) -> AuthResult<Url> {
        self.endpoint(&["telemedicine", "access-token", document_number])
    }

    pub(crate) fn code_url(&self) -> AuthResult<Url> {
        self.endpoint(&["auth", "code"])
    }
}

#[async_trait]
impl ConsultBackend for HttpBackend {
    async fn fetch_profile(&self, credential: &str, subject: &str) -> AuthResult<UserProfile> {
        let url = self.profile_url(subject)?;
        tracing::debug!(url = %url, "Fetching user profile");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(credential)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::warn!(status = %status, body_summary = %body_summary, "Profile lookup failed");
            return Err(AuthError::IdentityLookupFailed(format!(
                "HTTP {} ({})",
                status, body_summary
            )));
        }

        Ok(response.json().await?)
    }

    async fn fetch_access_grant(
        &self,
        credential: &str,
        document_number: &str,
    ) -> AuthResult<GrantResponse> {
        let url = self.grant_url(document_number)?;
        tracing::debug!("Requesting telemedicine access grant");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(credential)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::warn!(status = %status, body_summary = %body_summary, "Access grant request failed");
            return Err(AuthError::GrantFetchFailed(format!(
                "HTTP {} ({})",
                status, body_summary
            )));
        }

        Ok(response.json().await?)
    }

    async fn authenticate_by_code(&self, code: &str) -> AuthResult<AuthenticateResponse> {
        let url = self.code_url()?;
        tracing::debug!(url = %url, "Exchanging authentication code");

        let response = self
            .http_client
            .post(url)
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::warn!(status = %status, body_summary = %body_summary, "Code exchange failed");
            return Err(AuthError::CodeExchangeFailed(format!(
                "HTTP {} ({})",
                status, body_summary
            )));
        }

        Ok(response.json().await?)
    }
}
