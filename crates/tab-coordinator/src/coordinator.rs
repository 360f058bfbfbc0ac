//! Origin-side coordinator: opens at most one consultation window per tab
//! and announces every spawn to the other contexts of the origin.

use crate::channel::BroadcastChannel;
use crate::protocol::TabAnnouncement;
use crate::window::{WindowHandle, WindowOpener};
use crate::{CoordinatorError, CoordinatorResult};
use chrono::Utc;
use consult_auth::AccessGrant;
use consult_window::{WidgetSettings, WindowDocument};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A live window already existed and was focused.
    Focused { tab_id: String },
    /// A new window was spawned.
    Spawned { tab_id: String },
}

struct LiveWindow {
    tab_id: String,
    handle: Box<dyn WindowHandle>,
}

pub struct ConsultationCoordinator {
    channel: Option<Arc<dyn BroadcastChannel>>,
    opener: Arc<dyn WindowOpener>,
    settings: WidgetSettings,
    window: Mutex<Option<LiveWindow>>,
    closed: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConsultationCoordinator {
    /// Coordinator posting on `channel`. Pass `None` when the runtime has no
    /// messaging primitive: opens then proceed without announcements.
    pub fn new(
        channel: Option<Arc<dyn BroadcastChannel>>,
        opener: Arc<dyn WindowOpener>,
        settings: WidgetSettings,
    ) -> Self {
        if channel.is_none() {
            warn!("No message channel; consultation windows will not be coordinated");
        }
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            channel,
            opener,
            settings,
            window: Mutex::new(None),
            closed: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Tab id of the live window this tab holds, if any.
    pub fn live_tab_id(&self) -> Option<String> {
        let mut window = self.window.lock();
        prune_closed(&mut window);
        window.as_ref().map(|live| live.tab_id.clone())
    }

    /// Focus the live window, or announce and spawn a new one.
    pub fn open_consultation(&self, grant: &AccessGrant) -> CoordinatorResult<OpenOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoordinatorError::Closed);
        }

        let mut window = self.window.lock();
        prune_closed(&mut window);
        if let Some(live) = window.as_ref() {
            debug!(tab_id = %live.tab_id, "Focusing existing consultation window");
            live.handle.focus();
            return Ok(OpenOutcome::Focused {
                tab_id: live.tab_id.clone(),
            });
        }

        let tab_id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let document =
            WindowDocument::for_consultation(grant, &tab_id, &self.settings, &now.to_string())?;

        self.announce(&TabAnnouncement::new_tab_opened(tab_id.as_str(), now));

        let Some(handle) = self.opener.open(&document) else {
            warn!(tab_id = %tab_id, "Consultation window blocked");
            return Err(CoordinatorError::PopupBlocked);
        };

        info!(tab_id = %tab_id, "Consultation window spawned");
        *window = Some(LiveWindow {
            tab_id: tab_id.clone(),
            handle,
        });
        Ok(OpenOutcome::Spawned { tab_id })
    }

    fn announce(&self, message: &TabAnnouncement) {
        let Some(channel) = &self.channel else {
            return;
        };
        if let Err(err) = channel.post(message) {
            warn!(error = %err, "Failed to announce consultation window");
        }
    }

    /// React to an announcement from another context.
    pub fn handle_announcement(&self, message: &TabAnnouncement) {
        match message {
            TabAnnouncement::KeepThisTab { tab_id, .. } => {
                let mut window = self.window.lock();
                let superseded = window.as_ref().is_some_and(|live| &live.tab_id != tab_id);
                if superseded {
                    // The window closes itself on the same message.
                    if let Some(live) = window.take() {
                        info!(tab_id = %live.tab_id, kept = %tab_id, "Consultation window superseded");
                    }
                }
            }
            TabAnnouncement::NewTabOpened { tab_id, .. } => {
                debug!(tab_id = %tab_id, "Another context opened a consultation window");
            }
        }
    }

    /// Listen for announcements until [`close`](Self::close) is called.
    pub async fn run(&self) {
        let Some(channel) = &self.channel else {
            return;
        };
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut rx = channel.subscribe();
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                message = rx.recv() => match message {
                    Some(message) => self.handle_announcement(&message),
                    None => break,
                },
            }
        }
        debug!("Coordinator stopped listening");
    }

    /// End the coordinator's lifecycle. The spawned window, if any, stays
    /// open.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
        self.window.lock().take();
    }
}

fn prune_closed(window: &mut Option<LiveWindow>) {
    if window.as_ref().is_some_and(|live| live.handle.is_closed()) {
        if let Some(live) = window.take() {
            debug!(tab_id = %live.tab_id, "Consultation window was closed");
        }
    }
}
