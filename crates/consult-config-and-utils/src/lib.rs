//! Core configuration, paths, and logging setup for the teleconsult crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_LOG_LEVEL, DEFAULT_RELEVANCE_WINDOW_MS, DEFAULT_TOKEN_TTL_SECS,
    MAX_TOKEN_TTL_SECS,
    DEFAULT_WIDGET_SCRIPT_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::Paths;
