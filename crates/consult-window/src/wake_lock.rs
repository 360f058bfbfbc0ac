//! Screen wake lock held while a consultation is open.
//!
//! Failures are logged and otherwise ignored; the consultation never
//! depends on the lock.

use crate::WindowResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// An acquired lock. The platform may release it on its own (for example
/// when the window is hidden).
#[async_trait]
pub trait WakeLockSentinel: Send {
    fn is_released(&self) -> bool;

    async fn release(&mut self) -> WindowResult<()>;
}

#[async_trait]
pub trait WakeLockProvider: Send + Sync {
    async fn request(&self) -> WindowResult<Box<dyn WakeLockSentinel>>;
}

/// Tracks whether the window wants a lock and whether it still has one.
pub struct WakeLock {
    provider: Option<Arc<dyn WakeLockProvider>>,
    sentinel: Option<Box<dyn WakeLockSentinel>>,
    wanted: bool,
}

impl WakeLock {
    pub fn new(provider: Arc<dyn WakeLockProvider>) -> Self {
        Self {
            provider: Some(provider),
            sentinel: None,
            wanted: false,
        }
    }

    /// A wake lock for runtimes without the capability.
    pub fn unsupported() -> Self {
        Self {
            provider: None,
            sentinel: None,
            wanted: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.sentinel.as_ref().is_some_and(|s| !s.is_released())
    }

    pub async fn acquire(&mut self) {
        self.wanted = true;
        self.request_if_needed().await;
    }

    pub async fn release(&mut self) {
        self.wanted = false;
        if let Some(mut sentinel) = self.sentinel.take() {
            if sentinel.is_released() {
                return;
            }
            match sentinel.release().await {
                Ok(()) => debug!("Wake lock released"),
                Err(err) => warn!(error = %err, "Wake lock release failed"),
            }
        }
    }

    /// Re-acquire after the window becomes visible again if a lock was
    /// wanted and the platform dropped it.
    pub async fn on_visibility_change(&mut self, visible: bool) {
        if visible && self.wanted {
            self.request_if_needed().await;
        }
    }

    async fn request_if_needed(&mut self) {
        if self.is_held() {
            return;
        }
        let Some(provider) = self.provider.as_ref() else {
            debug!("Wake lock not supported");
            return;
        };
        match provider.request().await {
            Ok(sentinel) => {
                debug!("Wake lock acquired");
                self.sentinel = Some(sentinel);
            }
            Err(err) => warn!(error = %err, "Wake lock unavailable"),
        }
    }
}
