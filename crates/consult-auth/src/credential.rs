//! Credential store: persists the session bearer credential and its expiry.
//!
//! `load()` never hands out a stale value. A missing, malformed, or expired
//! entry is purged from storage as a side effect and reported as `None`.

use crate::identity;
use crate::{AuthError, AuthResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use consult_storage::{OriginStorage, SessionVault};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The session bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque bearer value sent to the backend.
    pub raw_token: String,
    /// Instant after which the credential must be treated as absent.
    pub expires_at: DateTime<Utc>,
    /// Subject embedded in the token payload, when it decodes.
    pub subject: Option<String>,
}

impl Credential {
    fn new(raw_token: String, expires_at: DateTime<Utc>) -> Self {
        let subject = identity::subject_from_token(&raw_token);
        Self {
            raw_token,
            expires_at,
            subject,
        }
    }

    /// Whether the credential is expired at `now` (`expires_at <= now`).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("raw_token", &format_args!("<{} bytes>", self.raw_token.len()))
            .field("expires_at", &self.expires_at)
            .field("subject", &self.subject)
            .finish()
    }
}

/// Why a stored credential was purged on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purge {
    MissingToken,
    MissingExpiry,
    MalformedExpiry,
    Expired,
    Unreadable,
}

/// Durable, origin-scoped credential storage.
#[derive(Clone)]
pub struct CredentialStore {
    vault: SessionVault,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn OriginStorage>) -> Self {
        Self {
            vault: SessionVault::new(storage),
        }
    }

    pub fn from_vault(vault: SessionVault) -> Self {
        Self { vault }
    }

    /// Access to the cached records sharing this store's storage.
    pub fn vault(&self) -> &SessionVault {
        &self.vault
    }

    /// Persist `token` with `expires_at = now + ttl_secs`, replacing any
    /// previous credential wholesale.
    pub fn save(&self, token: &str, ttl_secs: i64) -> AuthResult<Credential> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::CredentialInvalid(
                "refusing to store an empty token".to_string(),
            ));
        }

        let expires_at = Duration::try_seconds(ttl_secs)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::CredentialInvalid(format!("lifetime of {ttl_secs}s is out of range"))
            })?;
        self.vault
            .set_credential(token, expires_at.timestamp_millis())?;

        let credential = Credential::new(token.to_string(), expires_at);
        info!(
            expires_at = %credential.expires_at.to_rfc3339(),
            has_subject = credential.subject.is_some(),
            "Stored session credential"
        );
        Ok(credential)
    }

    /// Load the current credential, purging it if it is missing, malformed,
    /// or expired.
    pub fn load(&self) -> Option<Credential> {
        self.load_at(Utc::now())
    }

    pub(crate) fn load_at(&self, now: DateTime<Utc>) -> Option<Credential> {
        match self.read(now) {
            Ok(credential) => Some(credential),
            Err(Purge::MissingToken) if !self.has_expiry() => None,
            Err(reason) => {
                debug!(reason = ?reason, "Purging stored credential");
                if let Err(err) = self.clear() {
                    warn!(error = %err, "Failed to purge invalid credential");
                }
                None
            }
        }
    }

    fn has_expiry(&self) -> bool {
        matches!(self.vault.token_expiry_raw(), Ok(Some(_)))
    }

    fn read(&self, now: DateTime<Utc>) -> Result<Credential, Purge> {
        let token = self.vault.token().map_err(|err| {
            warn!(error = %err, "Failed to read stored credential");
            Purge::Unreadable
        })?;
        let token = match token {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Err(Purge::MissingToken),
        };

        let raw_expiry = self
            .vault
            .token_expiry_raw()
            .map_err(|_| Purge::Unreadable)?
            .ok_or(Purge::MissingExpiry)?;
        let expires_at = parse_expiry(&raw_expiry).ok_or(Purge::MalformedExpiry)?;

        let credential = Credential::new(token, expires_at);
        if credential.is_expired_at(now) {
            return Err(Purge::Expired);
        }
        Ok(credential)
    }

    /// Remove the credential and every cached record tied to it.
    pub fn clear(&self) -> AuthResult<()> {
        let removed = self.vault.clear_session()?;
        debug!(removed, "Cleared session storage");
        Ok(())
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
