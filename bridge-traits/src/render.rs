//! Render device abstraction.
//!
//! The render device is the host audio output endpoint. The core only needs a
//! small set of primitives from it: a monotonic render clock, factories for
//! gain/filter stages, a way to connect stages together, decoding of a byte
//! container into PCM, and single-use playback sources bound to a decoded
//! buffer.
//!
//! Host platforms provide a concrete implementation; the core never assumes
//! anything about how the signal graph is realized.

use crate::audio::PcmBuffer;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque identifier for a signal stage (gain, filter) owned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId(pub u64);

/// Opaque identifier for a single-use playback source.
///
/// Render sources cannot be restarted once stopped or ended; callers must
/// construct a fresh source for every playback segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u64);

/// Shape of a single filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterShape {
    /// Bell curve centered on the stage frequency.
    Peaking,
    /// Shelf boosting/attenuating everything below the stage frequency.
    LowShelf,
    /// Shelf boosting/attenuating everything above the stage frequency.
    HighShelf,
}

/// Parameters for one parametric filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Center (or corner) frequency in hertz.
    pub frequency: f32,
    /// Gain in decibels.
    pub gain_db: f32,
    /// Quality factor controlling the filter bandwidth.
    pub q: f32,
    /// Filter shape.
    pub shape: FilterShape,
}

impl FilterParams {
    /// A flat peaking stage at the given frequency.
    pub fn flat(frequency: f32) -> Self {
        Self {
            frequency,
            gain_db: 0.0,
            q: 1.0,
            shape: FilterShape::Peaking,
        }
    }
}

/// Options applied when starting a playback source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceStartOptions {
    /// Offset into the buffer, in seconds, to start rendering from.
    pub offset_seconds: f64,
    /// Playback rate multiplier (1.0 = normal speed).
    pub rate: f32,
    /// Whether the source should wrap around at the end of the buffer.
    pub looping: bool,
}

impl Default for SourceStartOptions {
    fn default() -> Self {
        Self {
            offset_seconds: 0.0,
            rate: 1.0,
            looping: false,
        }
    }
}

/// Host audio rendering device.
///
/// Implementations own the actual signal graph. All stage and source
/// identifiers returned by the factory methods stay valid until released.
///
/// # Errors
///
/// Methods return [`BridgeError`](crate::error::BridgeError) variants; in
/// particular `start_source` may fail with `NotAllowed` when the device is
/// suspended (e.g. no user gesture has unlocked audio output yet).
#[async_trait]
pub trait RenderDevice: Send + Sync {
    /// Output sample rate of the device in hertz.
    fn sample_rate(&self) -> u32;

    /// Monotonic render clock in seconds.
    ///
    /// This is the only time source the core uses for playback position
    /// arithmetic. It must never go backwards.
    fn clock_seconds(&self) -> f64;

    /// Create a gain stage with unity gain.
    fn create_gain_stage(&self) -> Result<StageId>;

    /// Create a filter stage with the given parameters.
    fn create_filter_stage(&self, params: FilterParams) -> Result<StageId>;

    /// Update the gain of a gain stage.
    fn set_stage_gain(&self, stage: StageId, gain: f32) -> Result<()>;

    /// Update parameters of a filter stage.
    fn update_filter_stage(&self, stage: StageId, params: FilterParams) -> Result<()>;

    /// Connect the output of `from` to the input of `to`.
    fn connect(&self, from: StageId, to: StageId) -> Result<()>;

    /// Connect a stage directly to the device output.
    fn connect_to_output(&self, stage: StageId) -> Result<()>;

    /// Drop every outgoing connection of `stage` (including to the device
    /// output). The stage itself stays alive.
    fn disconnect(&self, stage: StageId) -> Result<()>;

    /// Release a stage and free its resources.
    fn release_stage(&self, stage: StageId) -> Result<()>;

    /// Decode an in-memory byte container into a PCM buffer.
    ///
    /// `format_hint` is a file extension or MIME type when known.
    async fn decode(&self, data: Bytes, format_hint: Option<&str>) -> Result<PcmBuffer>;

    /// Create a playback source bound to a decoded buffer.
    fn create_source(&self, buffer: &PcmBuffer) -> Result<SourceId>;

    /// Start rendering a source. Single-use: a stopped source cannot be
    /// started again.
    fn start_source(&self, source: SourceId, options: SourceStartOptions) -> Result<()>;

    /// Stop a source. Safe to call on an already-stopped source.
    fn stop_source(&self, source: SourceId) -> Result<()>;

    /// Change the playback rate of a live source.
    fn set_source_rate(&self, source: SourceId, rate: f32) -> Result<()>;

    /// Change the looping flag of a live source.
    fn set_source_looping(&self, source: SourceId, looping: bool) -> Result<()>;

    /// Connect a source to a signal stage.
    fn connect_source(&self, source: SourceId, to: StageId) -> Result<()>;

    /// Create a stage that taps the audio output of a media element, so
    /// element-rendered audio can feed the signal chain.
    fn create_media_source(&self, element_id: u64) -> Result<StageId>;

    /// Release a source and free its resources.
    fn release_source(&self, source: SourceId) -> Result<()>;
}
