//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - Pretty, JSON and compact output formats
//! - Module-level filtering via `EnvFilter`
//! - An injectable [`LogSink`] handle for deterministic capture in tests
//!
//! ## Overview
//!
//! Two layers of observability coexist here. Modules use `tracing` macros
//! directly for ambient diagnostics; `init_logging` wires those into a
//! `tracing-subscriber` pipeline once per process. Separately, components
//! whose warnings are part of their contract (rejected state transitions,
//! isolated listener failures) report through an explicitly passed
//! [`LogHandle`] instead of the global dispatcher, so tests can inject a
//! capturing sink and assert on output deterministically.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::default().with_format(LogFormat::Compact);
//! init_logging(config)?;
//!
//! tracing::info!("engine started");
//! ```

use crate::error::{Error, Result};
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Severity of a sink-reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Destination for contract-level log output.
///
/// The default implementation forwards to `tracing`; tests substitute a
/// capturing sink.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, component: &str, message: &str);
}

/// `LogSink` that forwards into the `tracing` dispatcher.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, component: &str, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(component, "{message}"),
            LogLevel::Debug => tracing::debug!(component, "{message}"),
            LogLevel::Info => tracing::info!(component, "{message}"),
            LogLevel::Warn => tracing::warn!(component, "{message}"),
            LogLevel::Error => tracing::error!(component, "{message}"),
        }
    }
}

/// Cheaply cloneable handle around a [`LogSink`].
///
/// Passed down into components at construction instead of relying on a
/// process-wide logger singleton.
#[derive(Clone)]
pub struct LogHandle {
    sink: Arc<dyn LogSink>,
}

impl LogHandle {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn warn(&self, component: &str, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Warn, component, message.as_ref());
    }

    pub fn info(&self, component: &str, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Info, component, message.as_ref());
    }

    pub fn debug(&self, component: &str, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Debug, component, message.as_ref());
    }

    pub fn error(&self, component: &str, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Error, component, message.as_ref());
    }
}

impl Default for LogHandle {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_playback=debug")
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Initialize the logging system
///
/// This should be called once during application startup. Subsequent calls
/// will return an error.
///
/// # Errors
///
/// Returns an error if logging is already initialized or the filter string
/// is invalid.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let registry = tracing_subscriber::registry().with(filter);
    let init_result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target),
            )
            .try_init(),
    };

    init_result.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let base_level = match config.level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };

    let filter_string = if let Some(custom_filter) = &config.filter {
        custom_filter.clone()
    } else {
        // Default filter: engine crates at the configured level, noisy
        // dependencies at warn.
        format!(
            "core_runtime={},core_playback={},bridge_traits={},h2=warn,hyper=warn,reqwest=warn",
            base_level, base_level, base_level
        )
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct CapturingSink {
        entries: Mutex<Vec<(LogLevel, String, String)>>,
    }

    impl LogSink for CapturingSink {
        fn log(&self, level: LogLevel, component: &str, message: &str) {
            self.entries
                .lock()
                .push((level, component.to_string(), message.to_string()));
        }
    }

    #[test]
    fn handle_forwards_to_sink() {
        let sink = Arc::new(CapturingSink {
            entries: Mutex::new(Vec::new()),
        });
        let handle = LogHandle::new(sink.clone());

        handle.warn("state", "invalid transition");
        handle.info("player", "loaded");

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, LogLevel::Warn);
        assert_eq!(entries[0].1, "state");
        assert!(entries[0].2.contains("invalid transition"));
    }

    #[test]
    fn default_filter_is_valid() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn custom_filter_is_validated() {
        let config = LoggingConfig::default().with_filter("core_playback=debug");
        assert!(build_filter(&config).is_ok());

        let bad = LoggingConfig::default().with_filter("not a [filter");
        assert!(build_filter(&bad).is_err());
    }
}
