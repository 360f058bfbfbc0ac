//! Seams over the third-party consultation widget.

use crate::document::ScriptRef;
use crate::WindowResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Feedback from the widget. The only channel from the widget back into
/// the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// `onOpen`: the consultation surface is showing.
    Opened,
    /// `onClose`: the user or the widget ended the consultation.
    Closed,
    /// `onError`: the widget reported a failure.
    Error(String),
}

/// Configuration handed to the widget's `init`.
#[derive(Clone)]
pub struct WidgetConfig {
    pub access_token: String,
    pub locale: String,
    pub theme: String,
    pub events: mpsc::UnboundedSender<WidgetEvent>,
}

impl fmt::Debug for WidgetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetConfig")
            .field("access_token", &"<redacted>")
            .field("locale", &self.locale)
            .field("theme", &self.theme)
            .finish()
    }
}

/// The widget's global entry point.
pub trait WidgetSdk: Send + Sync {
    fn init(&self, config: WidgetConfig) -> WindowResult<()>;

    fn open(&self) -> WindowResult<()>;

    /// Optional on the widget side; absent implementations are no-ops.
    fn close(&self) -> WindowResult<()> {
        Ok(())
    }

    /// Optional on the widget side; absent implementations are no-ops.
    fn destroy(&self) -> WindowResult<()> {
        Ok(())
    }
}

/// The execution context of the spawned window.
#[async_trait]
pub trait WidgetRuntime: Send + Sync {
    /// Load a script, resolving on its load or error signal.
    async fn load_script(&self, script: &ScriptRef) -> WindowResult<()>;

    /// The widget entry point, once the loaded script has attached it.
    fn entry_point(&self) -> Option<Arc<dyn WidgetSdk>>;
}
