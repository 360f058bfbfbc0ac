//! Consultation window controller.
//!
//! Runs inside a spawned consultation window: loads the widget script,
//! waits (bounded) for the widget to attach, opens it with the inlined
//! access grant and keeps the screen awake while the consultation is
//! showing. Every failure ends in a local state; nothing propagates to the
//! opener.

use crate::document::WindowDocument;
use crate::readiness::ReadinessPolicy;
use crate::wake_lock::WakeLock;
use crate::widget::{WidgetConfig, WidgetEvent, WidgetRuntime, WidgetSdk};
use crate::{WindowError, WindowResult};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Label of the manual retry button in the local error view.
pub const RETRY_LABEL: &str = "Tentar novamente";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowState {
    Idle,
    Loading,
    Opening,
    Open,
    /// Script load or widget failure; shows the error view with retry.
    LoadFailed { message: String },
    /// The widget never attached within the readiness policy.
    WidgetUnavailable,
    Closed,
}

impl WindowState {
    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            WindowState::LoadFailed { .. } | WindowState::WidgetUnavailable
        )
    }
}

/// Local, recoverable error UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub retry_label: &'static str,
}

pub struct ConsultationWindow {
    document: WindowDocument,
    runtime: Arc<dyn WidgetRuntime>,
    policy: ReadinessPolicy,
    wake_lock: WakeLock,
    state: WindowState,
    sdk: Option<Arc<dyn WidgetSdk>>,
    events_tx: mpsc::UnboundedSender<WidgetEvent>,
    events_rx: mpsc::UnboundedReceiver<WidgetEvent>,
}

impl ConsultationWindow {
    pub fn new(
        document: WindowDocument,
        runtime: Arc<dyn WidgetRuntime>,
        policy: ReadinessPolicy,
        wake_lock: WakeLock,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            document,
            runtime,
            policy,
            wake_lock,
            state: WindowState::Idle,
            sdk: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn document(&self) -> &WindowDocument {
        &self.document
    }

    pub fn wake_lock_held(&self) -> bool {
        self.wake_lock.is_held()
    }

    pub fn error_view(&self) -> Option<ErrorView> {
        let message = match &self.state {
            WindowState::LoadFailed { message } => message.clone(),
            WindowState::WidgetUnavailable => {
                "O serviço de teleconsulta não respondeu.".to_string()
            }
            _ => return None,
        };
        Some(ErrorView {
            message,
            retry_label: RETRY_LABEL,
        })
    }

    /// Load the widget and ask it to open.
    pub async fn start(&mut self) -> &WindowState {
        if self.state != WindowState::Idle {
            debug!(state = ?self.state, "Window already started");
            return &self.state;
        }
        self.launch().await
    }

    /// Manual retry from the error view.
    pub async fn retry(&mut self) -> &WindowState {
        if !self.state.can_retry() {
            debug!(state = ?self.state, "Retry ignored");
            return &self.state;
        }
        info!(tab_id = %self.document.tab_id, "Retrying widget load");
        self.discard_sdk();
        self.launch().await
    }

    async fn launch(&mut self) -> &WindowState {
        self.state = WindowState::Loading;
        if let Err(err) = self.load_scripts().await {
            warn!(error = %err, "Widget script failed to load");
            self.state = WindowState::LoadFailed {
                message: err.to_string(),
            };
            return &self.state;
        }

        self.state = WindowState::Opening;
        let Some(sdk) = self.policy.wait_for_entry_point(self.runtime.as_ref()).await else {
            let err = WindowError::WidgetUnavailable {
                attempts: self.policy.max_attempts,
            };
            warn!(error = %err, "Widget did not attach");
            self.state = WindowState::WidgetUnavailable;
            return &self.state;
        };

        if let Err(err) = self.open_widget(sdk.as_ref()) {
            warn!(error = %err, "Widget failed to open");
            self.state = WindowState::LoadFailed {
                message: err.to_string(),
            };
            return &self.state;
        }
        self.sdk = Some(sdk);
        &self.state
    }

    async fn load_scripts(&self) -> WindowResult<()> {
        for script in &self.document.scripts {
            debug!(src = %script.src, "Loading widget script");
            self.runtime.load_script(script).await?;
        }
        Ok(())
    }

    fn open_widget(&self, sdk: &dyn WidgetSdk) -> WindowResult<()> {
        let access_token = self
            .document
            .access_token()
            .ok_or_else(|| WindowError::WidgetCallFailed("no access grant inlined".to_string()))?;
        sdk.init(WidgetConfig {
            access_token: access_token.to_string(),
            locale: self.document.locale().unwrap_or_default().to_string(),
            theme: self.document.theme().unwrap_or_default().to_string(),
            events: self.events_tx.clone(),
        })?;
        sdk.open()
    }

    /// Wait for the next widget callback and apply it.
    pub async fn next_event(&mut self) -> Option<WidgetEvent> {
        let event = self.events_rx.recv().await?;
        self.handle_event(event.clone()).await;
        Some(event)
    }

    pub async fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Opened => {
                if matches!(self.state, WindowState::Opening | WindowState::Open) {
                    info!(tab_id = %self.document.tab_id, "Consultation open");
                    self.state = WindowState::Open;
                    self.wake_lock.acquire().await;
                }
            }
            WidgetEvent::Closed => {
                info!(tab_id = %self.document.tab_id, "Widget closed");
                self.discard_sdk();
                self.wake_lock.release().await;
                self.state = WindowState::Closed;
            }
            WidgetEvent::Error(message) => {
                warn!(message = %message, "Widget reported an error");
                self.wake_lock.release().await;
                if self.state != WindowState::Closed {
                    self.state = WindowState::LoadFailed { message };
                }
            }
        }
    }

    pub async fn on_visibility_change(&mut self, visible: bool) {
        if self.state == WindowState::Open {
            self.wake_lock.on_visibility_change(visible).await;
        }
    }

    /// Explicit close from the window.
    pub async fn close(&mut self) {
        if let Some(sdk) = &self.sdk {
            if let Err(err) = sdk.close() {
                warn!(error = %err, "Widget close failed");
            }
        }
        self.wake_lock.release().await;
        self.state = WindowState::Closed;
    }

    /// Window unload.
    pub async fn unload(&mut self) {
        self.discard_sdk();
        self.wake_lock.release().await;
        self.state = WindowState::Closed;
    }

    fn discard_sdk(&mut self) {
        if let Some(sdk) = self.sdk.take() {
            if let Err(err) = sdk.destroy() {
                warn!(error = %err, "Widget destroy failed");
            }
        }
    }
}
