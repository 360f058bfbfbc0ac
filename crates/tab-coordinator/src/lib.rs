//! Cross-context coordination of consultation windows.
//!
//! Advisory mutual exclusion over one shared message channel: the tab
//! that opens a consultation announces it, and every consultation window
//! decides for itself (with the user's help) whether it has been
//! superseded. There is no arbiter and no persistence.

mod channel;
mod coordinator;
mod error;
mod peer;
mod protocol;
mod window;

pub use channel::{BroadcastChannel, BroadcastHub, ChannelEndpoint, ChannelReceiver};
pub use coordinator::{ConsultationCoordinator, OpenOutcome};
pub use error::{CoordinatorError, CoordinatorResult};
pub use peer::{PeerAction, WindowPeer};
pub use protocol::{is_relevant, TabAnnouncement, CONSULTATION_CHANNEL};
pub use window::{SupersedePrompt, WindowControl, WindowHandle, WindowOpener};
