//! Origin-scoped storage for the teleconsult session.
//!
//! Mirrors what a browser's durable, origin-scoped key/value storage
//! offers: plaintext string entries shared by every context of the same
//! origin. Backends:
//! - **Memory**: [`MemoryStorage`], for tests and ephemeral contexts
//! - **File**: [`FileStorage`], one JSON document per origin

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::OriginStorage;
pub use vault::{SessionVault, SignupStatus};

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_unique() {
        let keys = StorageKeys::SESSION_KEYS;
        assert!(keys.iter().all(|k| !k.is_empty()));

        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }
}
