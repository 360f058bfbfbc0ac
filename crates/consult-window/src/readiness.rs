//! Bounded wait for the widget entry point.

use crate::widget::{WidgetRuntime, WidgetSdk};
use consult_config_and_utils::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long to keep checking for the widget entry point after its script
/// loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Total number of checks, the first one immediate.
    pub max_attempts: u32,
    /// Delay before the second check in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between checks in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 250,
            max_delay_ms: 2_000,
        }
    }
}

impl ReadinessPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.widget_ready_max_attempts.max(1),
            initial_delay_ms: config.widget_ready_initial_delay_ms,
            max_delay_ms: config.widget_ready_max_delay_ms,
        }
    }

    /// Delay after a failed check (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Check `runtime` for the entry point until it attaches or the
    /// attempts run out.
    pub async fn wait_for_entry_point(
        &self,
        runtime: &dyn WidgetRuntime,
    ) -> Option<Arc<dyn WidgetSdk>> {
        for attempt in 0..self.max_attempts {
            if let Some(sdk) = runtime.entry_point() {
                debug!(attempt, "Widget entry point attached");
                return Some(sdk);
            }
            if attempt + 1 < self.max_attempts {
                let delay = self.delay_for_attempt(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Widget entry point missing");
                tokio::time::sleep(delay).await;
            }
        }
        None
    }
}
