//! Branded value types and small shared enums.
//!
//! The transport surface deals in validated wrappers instead of raw floats:
//! a [`Volume`] is always inside `[0.0, 1.0]`, a [`PlaybackRate`] is always
//! finite and non-negative, a [`Seconds`] value is always finite and
//! non-negative. Construction is the only place validation happens; code
//! holding one of these values never re-checks.

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};

/// Normalized volume in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Volume(f32);

impl Volume {
    /// Unity gain.
    pub const MAX: Volume = Volume(1.0);
    /// Silence.
    pub const MIN: Volume = Volume(0.0);

    /// Build a volume, clamping into range.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for non-finite input.
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() {
            return Err(PlayerError::InvalidArgument(format!(
                "volume must be finite, got {value}"
            )));
        }
        Ok(Self(value.clamp(0.0, 1.0)))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::MAX
    }
}

/// Playback rate multiplier. `1.0` is normal speed; negative rates are
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PlaybackRate(f32);

impl PlaybackRate {
    pub const NORMAL: PlaybackRate = PlaybackRate(1.0);

    /// Build a rate.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for negative or non-finite input.
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "playback rate must be finite and non-negative, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        PlaybackRate::NORMAL
    }
}

/// A non-negative, finite duration or position in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(f64);

impl Seconds {
    pub const ZERO: Seconds = Seconds(0.0);

    /// Build a time value, clamping negatives to zero.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for NaN or infinite input.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(PlayerError::InvalidArgument(format!(
                "time must be finite, got {value}"
            )));
        }
        Ok(Self(value.max(0.0)))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// One selectable quality level of an adaptive stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// 0-based index into the ordered level list.
    pub index: usize,
    /// Average bitrate in bits per second.
    pub bitrate: u32,
    /// Display label.
    pub label: String,
}

/// Rendering strategy of a playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Decoded PCM rendered through device buffer sources.
    DirectBuffer,
    /// A host media element renders the source itself.
    MediaElement,
}

/// Caller preference for backend selection.
///
/// `Auto` follows the loader factory's recommendation; the forced modes
/// override it, except that a loader producing decoded PCM always falls
/// back to [`BackendKind::DirectBuffer`] (a media element cannot render raw
/// buffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackMode {
    #[default]
    Auto,
    ForceBuffer,
    ForceElement,
}
