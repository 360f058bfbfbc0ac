//! Error types for the consultation window.

use thiserror::Error;

/// Consultation window error type.
///
/// None of these leave the window: the controller turns each one into a
/// local state.
#[derive(Debug, Error)]
pub enum WindowError {
    /// The widget script failed to load.
    #[error("Widget script failed to load: {0}")]
    WidgetLoadFailed(String),

    /// The widget entry point never attached.
    #[error("Widget entry point unavailable after {attempts} checks")]
    WidgetUnavailable { attempts: u32 },

    /// The widget rejected a call.
    #[error("Widget call failed: {0}")]
    WidgetCallFailed(String),

    /// Screen wake lock could not be acquired or released.
    #[error("Wake lock unavailable: {0}")]
    WakeLockUnavailable(String),

    /// The widget script URL is not a valid URL.
    #[error("Invalid widget script URL: {0}")]
    InvalidScriptUrl(#[from] url::ParseError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for consultation window operations.
pub type WindowResult<T> = Result<T, WindowError>;
