//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure with an injectable sink
//! - Event listener registry with snapshot-based emission
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the engine crates depend on. It
//! establishes the logging conventions and the publish/subscribe mechanism
//! used throughout the system. There is deliberately no global mutable
//! state: observability is carried by an explicit [`LogHandle`] value and
//! event distribution by [`EventRegistry`] instances owned by their
//! components.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{Event, EventRegistry, ListenerId};
pub use logging::{init_logging, LogHandle, LogLevel, LogSink, LoggingConfig, TracingSink};
