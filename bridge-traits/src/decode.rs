//! Streamed decoder abstraction.
//!
//! Boundary to the external codec/demux library. Given an opaque byte
//! container, the decoder yields a sequence of PCM chunks; the core merges
//! and resamples them, it never inspects the container itself.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A chunk of decoded PCM produced by a [`DecodeSession`].
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct PcmChunk {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    /// Frames in this chunk (one sample per channel).
    pub frames: usize,
    /// Sample rate of this chunk in hertz.
    pub sample_rate: u32,
    /// Channel count of this chunk.
    pub channels: u16,
}

impl PcmChunk {
    pub fn is_empty(&self) -> bool {
        self.frames == 0 || self.samples.is_empty()
    }
}

/// Stream parameters resolved when a session is opened.
#[derive(Debug, Clone)]
pub struct DecodedStreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Total duration in seconds, when the container declares it.
    pub duration: Option<f64>,
    /// Short codec name for diagnostics, when known.
    pub codec: Option<String>,
}

/// Decoder entry point: opens a byte container into a pull session.
#[async_trait]
pub trait StreamDecoder: Send + Sync {
    /// Probe `data` and prepare a decode session.
    ///
    /// `format_hint` is a file extension or MIME type when known.
    ///
    /// # Errors
    ///
    /// Fails with `Decode` when the container cannot be probed or no audio
    /// track is present.
    async fn open(&self, data: Bytes, format_hint: Option<&str>) -> Result<Box<dyn DecodeSession>>;
}

/// An in-progress streamed decode.
#[async_trait]
pub trait DecodeSession: Send {
    /// Parameters of the stream being decoded.
    fn info(&self) -> DecodedStreamInfo;

    /// Pull the next chunk of PCM. Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    ///
    /// A `Decode` error mid-stream may be recoverable by the caller when
    /// earlier chunks already decoded; the session itself is finished either
    /// way.
    async fn next_chunk(&mut self) -> Result<Option<PcmChunk>>;
}
