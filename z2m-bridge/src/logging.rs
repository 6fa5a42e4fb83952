//! Logging setup for the bridge binary and embedding hosts
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to whoever owns the process.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber; the host owns logging
    Silent,
    /// Compact stderr output at `info`
    Development,
    /// Pretty output at `debug` with source locations
    Debug,
}

impl LoggingMode {
    /// Parse a `Z2M_LOG_MODE` value
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(LoggingMode::Silent),
            "development" => Some(LoggingMode::Development),
            "debug" => Some(LoggingMode::Debug),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Install a global subscriber for `mode`
///
/// # Environment Variables
///
/// - `Z2M_LOG_LEVEL`: filter directive, e.g. `debug` or `z2m_event_manager=trace`
/// - `RUST_LOG`: used when `Z2M_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    if mode != LoggingMode::Silent && is_initialized() {
        tracing::debug!("Tracing subscriber already installed, keeping it");
        return Ok(());
    }

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;
            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;
            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize from `Z2M_LOG_MODE`, using `default` when unset or unknown
pub fn init_logging_from_env(default: LoggingMode) -> Result<(), LoggingError> {
    let mode = std::env::var("Z2M_LOG_MODE")
        .ok()
        .and_then(|raw| LoggingMode::parse(&raw))
        .unwrap_or(default);

    init_logging(mode)
}

fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var("Z2M_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.clone(),
        reason: e.to_string(),
    })
}

/// Whether a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
