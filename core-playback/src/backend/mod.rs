//! Playback backends.
//!
//! Two rendering strategies share one transport contract: the
//! direct-buffer backend renders decoded PCM through device sources, the
//! media-element backend delegates to a host element. The set is closed
//! (a sum type keeps dispatch exhaustive) and both variants report through
//! the same normalized event stream, handed over as an
//! [`mpsc::UnboundedSender`] at construction.

mod direct;
mod element;

pub use direct::DirectBufferBackend;
pub use element::{ElementSource, MediaElementBackend};

use crate::error::{PlayerError, Result};
use crate::types::{BackendKind, PlaybackRate, Volume};
use bridge_traits::render::{RenderDevice, StageId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Normalized backend notifications.
///
/// Spontaneous backend activity (element events, render ticks, natural
/// end) flows through these; the orchestrator translates them into player
/// events and state transitions.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    Play,
    Playing,
    Pause,
    Ended,
    TimeUpdate(f64),
    DurationChange(f64),
    Waiting,
    Progress,
    Error(PlayerError),
}

/// Sender half of a backend's normalized event stream.
pub type BackendEventSender = mpsc::UnboundedSender<BackendEvent>;

/// Closed set of playback backends.
pub enum PlaybackBackend {
    DirectBuffer(DirectBufferBackend),
    MediaElement(MediaElementBackend),
}

impl PlaybackBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            PlaybackBackend::DirectBuffer(_) => BackendKind::DirectBuffer,
            PlaybackBackend::MediaElement(_) => BackendKind::MediaElement,
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.is_ready(),
            PlaybackBackend::MediaElement(backend) => backend.is_ready(),
        }
    }

    pub fn is_playing(&self) -> bool {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.is_playing(),
            PlaybackBackend::MediaElement(backend) => backend.is_playing(),
        }
    }

    /// Duration in seconds, when the backend knows it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            PlaybackBackend::DirectBuffer(backend) => Some(backend.duration()),
            PlaybackBackend::MediaElement(backend) => backend.duration(),
        }
    }

    /// Start or resume rendering.
    ///
    /// # Errors
    ///
    /// `PlaybackRejected` when the host refuses to start (suspended device,
    /// missing user gesture); other faults as `PlaybackFailed`.
    pub async fn play(&self) -> Result<()> {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.play().await,
            PlaybackBackend::MediaElement(backend) => backend.play().await,
        }
    }

    pub fn pause(&self) -> Result<()> {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.pause(),
            PlaybackBackend::MediaElement(backend) => backend.pause(),
        }
    }

    /// Halt rendering and reset the backend-local position to zero.
    pub fn stop(&self) -> Result<()> {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.stop(),
            PlaybackBackend::MediaElement(backend) => backend.stop(),
        }
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.seek(seconds),
            PlaybackBackend::MediaElement(backend) => backend.seek(seconds),
        }
    }

    /// Backend-local position estimate in seconds.
    ///
    /// The orchestrator's time controller stays authoritative; this exists
    /// for backends that must track position themselves anyway.
    pub fn current_time(&self) -> f64 {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.current_time(),
            PlaybackBackend::MediaElement(backend) => backend.current_time(),
        }
    }

    pub fn set_volume(&self, volume: Volume) {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.set_volume(volume),
            PlaybackBackend::MediaElement(backend) => backend.set_volume(volume),
        }
    }

    pub fn set_muted(&self, muted: bool) {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.set_muted(muted),
            PlaybackBackend::MediaElement(backend) => backend.set_muted(muted),
        }
    }

    pub fn set_rate(&self, rate: PlaybackRate) {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.set_rate(rate),
            PlaybackBackend::MediaElement(backend) => backend.set_rate(rate),
        }
    }

    pub fn set_loop(&self, looping: bool) {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.set_loop(looping),
            PlaybackBackend::MediaElement(backend) => backend.set_loop(looping),
        }
    }

    /// Wire this backend's output into the render graph and return the
    /// stage to connect downstream. `None` when no device is involved
    /// (element-only playback).
    pub fn connect_to_render_graph(
        &self,
        device: Option<&Arc<dyn RenderDevice>>,
    ) -> Result<Option<StageId>> {
        match self {
            PlaybackBackend::DirectBuffer(backend) => Ok(Some(backend.output_stage())),
            PlaybackBackend::MediaElement(backend) => backend.connect_to_render_graph(device),
        }
    }

    /// Release backend resources. Idempotent.
    pub fn dispose(&self) {
        match self {
            PlaybackBackend::DirectBuffer(backend) => backend.dispose(),
            PlaybackBackend::MediaElement(backend) => backend.dispose(),
        }
    }
}

impl std::fmt::Debug for PlaybackBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PlaybackBackend").field(&self.kind()).finish()
    }
}
