//! Spawned-window side of the coordination protocol.
//!
//! A consultation window decides for itself whether an announcement
//! supersedes it. It subscribes when created, so anything posted before
//! then is never seen; relevance is judged from the announcement's age
//! alone.

use crate::channel::{BroadcastChannel, ChannelReceiver};
use crate::protocol::{is_relevant, TabAnnouncement};
use crate::window::{SupersedePrompt, WindowControl};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a window did in response to an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAction {
    Ignored,
    /// The user kept this window; `KEEP_THIS_TAB` was posted.
    KeptOpen,
    Closed,
}

pub struct WindowPeer {
    tab_id: String,
    channel: Option<Arc<dyn BroadcastChannel>>,
    receiver: Option<ChannelReceiver>,
    prompt: Arc<dyn SupersedePrompt>,
    control: Arc<dyn WindowControl>,
    relevance_window_ms: i64,
    closed: bool,
}

impl WindowPeer {
    pub fn new(
        tab_id: impl Into<String>,
        channel: Option<Arc<dyn BroadcastChannel>>,
        prompt: Arc<dyn SupersedePrompt>,
        control: Arc<dyn WindowControl>,
        relevance_window_ms: i64,
    ) -> Self {
        let receiver = channel.as_ref().map(|channel| channel.subscribe());
        Self {
            tab_id: tab_id.into(),
            channel,
            receiver,
            prompt,
            control,
            relevance_window_ms,
            closed: false,
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Apply one announcement received at `now` (epoch milliseconds).
    pub async fn handle(&mut self, message: &TabAnnouncement, now: i64) -> PeerAction {
        if self.closed {
            return PeerAction::Ignored;
        }

        match message {
            TabAnnouncement::NewTabOpened { tab_id, timestamp } => {
                if *tab_id == self.tab_id {
                    return PeerAction::Ignored;
                }
                if !is_relevant(*timestamp, now, self.relevance_window_ms) {
                    debug!(tab_id = %tab_id, age_ms = now.saturating_sub(*timestamp), "Stale announcement ignored");
                    return PeerAction::Ignored;
                }

                if self.prompt.confirm_supersede().await {
                    info!(tab_id = %self.tab_id, newer = %tab_id, "Closing superseded window");
                    self.close();
                    PeerAction::Closed
                } else {
                    info!(tab_id = %self.tab_id, "User kept this consultation window");
                    self.post(&TabAnnouncement::keep_this_tab(
                        self.tab_id.as_str(),
                        Utc::now().timestamp_millis(),
                    ));
                    PeerAction::KeptOpen
                }
            }
            TabAnnouncement::KeepThisTab { tab_id, .. } => {
                if *tab_id == self.tab_id {
                    return PeerAction::Ignored;
                }
                info!(tab_id = %self.tab_id, kept = %tab_id, "Another window was kept; closing");
                self.close();
                PeerAction::Closed
            }
        }
    }

    /// Receive and apply announcements until this window closes or the
    /// channel goes away. Without a channel, returns immediately.
    pub async fn run(&mut self) -> PeerAction {
        let Some(mut receiver) = self.receiver.take() else {
            return PeerAction::Ignored;
        };

        while let Some(message) = receiver.recv().await {
            let action = self.handle(&message, Utc::now().timestamp_millis()).await;
            if action == PeerAction::Closed {
                return action;
            }
        }
        PeerAction::Ignored
    }

    fn post(&self, message: &TabAnnouncement) {
        let Some(channel) = &self.channel else {
            return;
        };
        if let Err(err) = channel.post(message) {
            warn!(error = %err, "Failed to post announcement");
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.control.close();
    }
}
