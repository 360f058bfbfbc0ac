//! Storage key constants.

/// Origin storage keys.
pub struct StorageKeys;

impl StorageKeys {
    /// Session bearer credential
    pub const TOKEN: &'static str = "token";

    /// Credential expiry, epoch milliseconds
    pub const TOKEN_EXPIRY: &'static str = "token_expiry";

    /// Cached user profile (JSON)
    pub const USER_PROFILE: &'static str = "user_profile";

    /// Cached signup/status record (JSON)
    pub const SIGNUP_STATUS: &'static str = "signup_status";

    /// Cached email address
    pub const USER_EMAIL: &'static str = "user_email";

    /// Every key tied to the authenticated session.
    pub const SESSION_KEYS: [&'static str; 5] = [
        Self::TOKEN,
        Self::TOKEN_EXPIRY,
        Self::USER_PROFILE,
        Self::SIGNUP_STATUS,
        Self::USER_EMAIL,
    ];
}
