//! Logging initialization.
//!
//! Thin wrapper over the `observability` crate so binaries share one setup:
//! structured JSONL to `~/.teleconsult/logs/dev.jsonl`, level from
//! `RUST_LOG` or the provided default, and compact stderr output unless
//! `TELECONSULT_LOG_STDERR=0`.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize logging for the `consult` service.
pub fn init_logging(level: &str) {
    init_logging_for_service("consult", level, None);
}

/// Initialize logging with a custom service name and optional log file.
pub fn init_logging_for_service(service_name: &str, level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr: stderr_enabled(std::env::var("TELECONSULT_LOG_STDERR").ok()),
    });
}

fn stderr_enabled(raw: Option<String>) -> bool {
    match raw.as_deref().map(str::trim) {
        Some("0") | Some("false") | Some("off") => false,
        _ => true,
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_all_variants() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("info"), tracing::Level::INFO);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("warning"), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_level_unknown_defaults_to_info() {
        assert_eq!(parse_level(""), tracing::Level::INFO);
        assert_eq!(parse_level("verbose"), tracing::Level::INFO);
    }

    #[test]
    fn test_stderr_toggle() {
        assert!(stderr_enabled(None));
        assert!(stderr_enabled(Some("1".to_string())));
        assert!(!stderr_enabled(Some("0".to_string())));
        assert!(!stderr_enabled(Some(" off ".to_string())));
    }
}
