//! Runtime seams for creating and controlling browsing contexts.

use async_trait::async_trait;
use consult_window::WindowDocument;

/// The opener's reference to a spawned window.
pub trait WindowHandle: Send + Sync {
    fn is_closed(&self) -> bool;

    fn focus(&self);
}

/// Creates top-level browsing contexts.
pub trait WindowOpener: Send + Sync {
    /// Spawn a window rendering `document`; `None` when the runtime blocked
    /// it.
    fn open(&self, document: &WindowDocument) -> Option<Box<dyn WindowHandle>>;
}

/// Lets a spawned window close itself.
pub trait WindowControl: Send + Sync {
    fn close(&self);
}

/// Asks the user whether a newer consultation window should replace this
/// one.
#[async_trait]
pub trait SupersedePrompt: Send + Sync {
    /// `true` when the user accepts closing this window.
    async fn confirm_supersede(&self) -> bool;
}
