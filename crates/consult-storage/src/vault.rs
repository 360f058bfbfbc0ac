//! High-level API over the session-related storage keys.

use crate::{OriginStorage, StorageError, StorageKeys, StorageResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cached signup/status record written after a code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupStatus {
    /// Backend asked for additional profile data before the account is usable.
    pub need_more_information: bool,
    /// When the record was written (RFC 3339).
    pub recorded_at: String,
}

/// Typed access to the session entries of an [`OriginStorage`].
#[derive(Clone)]
pub struct SessionVault {
    storage: Arc<dyn OriginStorage>,
}

impl SessionVault {
    pub fn new(storage: Arc<dyn OriginStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Credential
    // ==========================================

    pub fn token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::TOKEN)
    }

    /// Raw expiry entry; parsing is left to the caller so malformed values
    /// can be detected and purged.
    pub fn token_expiry_raw(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::TOKEN_EXPIRY)
    }

    /// Write token and expiry together.
    pub fn set_credential(&self, token: &str, expires_at_ms: i64) -> StorageResult<()> {
        self.storage.set(StorageKeys::TOKEN, token)?;
        self.storage
            .set(StorageKeys::TOKEN_EXPIRY, &expires_at_ms.to_string())
    }

    // ==========================================
    // Cached records
    // ==========================================

    pub fn set_profile<T: Serialize>(&self, profile: &T) -> StorageResult<()> {
        self.set_json(StorageKeys::USER_PROFILE, profile)
    }

    pub fn profile<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        self.get_json(StorageKeys::USER_PROFILE)
    }

    pub fn set_signup_status(&self, status: &SignupStatus) -> StorageResult<()> {
        self.set_json(StorageKeys::SIGNUP_STATUS, status)
    }

    pub fn signup_status(&self) -> StorageResult<Option<SignupStatus>> {
        self.get_json(StorageKeys::SIGNUP_STATUS)
    }

    pub fn set_email(&self, email: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::USER_EMAIL, email)
    }

    pub fn email(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::USER_EMAIL)
    }

    /// Remove every session entry. Returns how many were present.
    pub fn clear_session(&self) -> StorageResult<usize> {
        self.storage.delete_all(&StorageKeys::SESSION_KEYS)
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(key, &json)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Encoding(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }
}
