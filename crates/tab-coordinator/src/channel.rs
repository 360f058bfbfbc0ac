//! Named message channels shared by same-origin contexts.
//!
//! [`BroadcastHub`] hands out [`ChannelEndpoint`]s. Everything posted on
//! an endpoint reaches every other endpoint of the same name that is
//! already subscribed, in send order. An endpoint never receives its own
//! posts, and a subscriber created after a post never sees it.

use crate::protocol::TabAnnouncement;
use crate::{CoordinatorError, CoordinatorResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Envelope {
    from: u64,
    message: TabAnnouncement,
}

/// One context's view of a named channel.
pub trait BroadcastChannel: Send + Sync {
    fn post(&self, message: &TabAnnouncement) -> CoordinatorResult<()>;

    fn subscribe(&self) -> ChannelReceiver;
}

/// Incoming side of a [`BroadcastChannel`].
pub struct ChannelReceiver {
    own_id: u64,
    rx: broadcast::Receiver<Envelope>,
}

impl ChannelReceiver {
    /// Next message from another endpoint, or `None` once the channel is
    /// gone.
    pub async fn recv(&mut self) -> Option<TabAnnouncement> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.from == self.own_id => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Channel receiver lagged; announcements dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Registry of named channels for one origin.
#[derive(Default)]
pub struct BroadcastHub {
    senders: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an endpoint on the channel called `name`.
    pub fn open(&self, name: &str) -> ChannelEndpoint {
        let sender = self
            .senders
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(channel = name, endpoint = id, "Opened channel endpoint");
        ChannelEndpoint {
            id,
            name: name.to_string(),
            sender,
            closed: AtomicBool::new(false),
        }
    }

    /// Drop channels nobody listens to anymore.
    pub fn cleanup(&self) {
        self.senders
            .lock()
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn channel_count(&self) -> usize {
        self.senders.lock().len()
    }
}

/// A context's handle on a named channel.
pub struct ChannelEndpoint {
    id: u64,
    name: String,
    sender: broadcast::Sender<Envelope>,
    closed: AtomicBool,
}

impl ChannelEndpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop posting on this endpoint.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl BroadcastChannel for ChannelEndpoint {
    fn post(&self, message: &TabAnnouncement) -> CoordinatorResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoordinatorError::ChannelClosed);
        }
        let envelope = Envelope {
            from: self.id,
            message: message.clone(),
        };
        // No listeners is not an error: the message is simply lost.
        if self.sender.send(envelope).is_err() {
            debug!(channel = %self.name, "Posted with no listeners");
        }
        Ok(())
    }

    fn subscribe(&self) -> ChannelReceiver {
        ChannelReceiver {
            own_id: self.id,
            rx: self.sender.subscribe(),
        }
    }
}
