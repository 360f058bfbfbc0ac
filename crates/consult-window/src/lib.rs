//! The consultation window: what a spawned window renders and how it
//! drives the third-party widget.

mod controller;
mod document;
mod error;
mod readiness;
mod wake_lock;
mod widget;

pub use controller::{ConsultationWindow, ErrorView, WindowState, RETRY_LABEL};
pub use document::{
    CallbackBindings, ScriptRef, WidgetSettings, WindowDocument, CACHE_BUSTER_PARAM, WINDOW_TITLE,
};
pub use error::{WindowError, WindowResult};
pub use readiness::ReadinessPolicy;
pub use wake_lock::{WakeLock, WakeLockProvider, WakeLockSentinel};
pub use widget::{WidgetConfig, WidgetEvent, WidgetRuntime, WidgetSdk};
