//! Coordinator error types.

use thiserror::Error;

/// Coordinator error type.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The runtime refused to create the consultation window.
    #[error("Consultation window was blocked by the browser")]
    PopupBlocked,

    /// The coordinator was closed.
    #[error("Coordinator is closed")]
    Closed,

    /// The message channel endpoint was closed.
    #[error("Message channel is closed")]
    ChannelClosed,

    /// The window document could not be built.
    #[error("Window document error: {0}")]
    Document(#[from] consult_window::WindowError),
}

impl CoordinatorError {
    /// Text for the notification shown to the user, if this error warrants
    /// one.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            CoordinatorError::PopupBlocked => Some(
                "O navegador bloqueou a janela da consulta. Permita pop-ups para este site e tente novamente.",
            ),
            _ => None,
        }
    }
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
