//! # Playback Engine Core
//!
//! Audio-playback orchestration: given a heterogeneous source descriptor
//! (remote URL, in-memory buffer, adaptive-streaming manifest, raw byte
//! stream), select a loading strategy, produce a playable signal and drive
//! it through one uniform transport surface with consistent timing.
//!
//! ## Overview
//!
//! The engine is built from five tightly interacting pieces:
//!
//! - [`state`]: the finite-state lifecycle gating every operation
//! - [`clock`]: the clock-anchored position model (seek/rate/loop without
//!   a polling timer)
//! - [`loader`]: source classification, cancellable loading, quality
//!   negotiation
//! - [`backend`]: one transport contract over a direct-buffer renderer
//!   and a media-element renderer
//! - [`signal`]: gain staging plus a parametric filter bank on the render
//!   device
//!
//! [`player::Player`] wires them together. Everything the engine does not
//! implement itself (codecs, the adaptive protocol, the host device) is
//! reached through the traits in `bridge-traits`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{Player, PlayerConfig, SourceDescriptor};
//!
//! let config = PlayerConfig::builder()
//!     .render_device(device)
//!     .http_client(http)
//!     .build()?;
//! let player = Player::new(config)?;
//!
//! player.load(SourceDescriptor::from_url("https://cdn.example.com/track.mp3")).await?;
//! player.play().await?;
//! ```

pub mod backend;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod loader;
pub mod player;
pub mod resample;
pub mod signal;
pub mod source;
pub mod state;
pub mod types;

#[cfg(feature = "core-decoder")]
pub mod decoder;

#[cfg(feature = "http-streaming")]
pub mod net;

pub use cancel::CancellationToken;
pub use clock::TimeController;
pub use config::PlayerConfig;
pub use error::{ErrorCode, PlayerError, Result};
pub use events::{PlayerEvent, PlayerEventKind};
pub use player::Player;
pub use signal::SignalChain;
pub use source::{RawData, SourceDescriptor, SourceKind};
pub use state::{PlayerState, StateManager};
pub use types::{BackendKind, PlaybackMode, PlaybackRate, QualityLevel, Seconds, Volume};

#[cfg(feature = "core-decoder")]
pub use decoder::SymphoniaStreamDecoder;

#[cfg(feature = "http-streaming")]
pub use net::ReqwestHttpClient;
