//! Shared audio data types exchanged across the bridge boundary.

use serde::{Deserialize, Serialize};

/// A fully decoded block of PCM audio ready for direct rendering.
///
/// Samples are interleaved `f32` values normalized to `[-1.0, 1.0]`.
/// For stereo audio the layout is `[L0, R0, L1, R1, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcmBuffer {
    /// Interleaved PCM samples.
    pub samples: Vec<f32>,
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in hertz.
    pub sample_rate: u32,
}

impl PcmBuffer {
    /// Create a buffer from interleaved samples.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of frames (one sample per channel) held by this buffer.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playable duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Returns `true` if the buffer holds no sample data.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_and_duration() {
        let buffer = PcmBuffer::new(vec![0.0; 88200], 2, 44100);
        assert_eq!(buffer.frames(), 44100);
        assert!((buffer.duration_seconds() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_channel_buffer_is_empty_of_frames() {
        let buffer = PcmBuffer::new(vec![0.0; 16], 0, 44100);
        assert_eq!(buffer.frames(), 0);
    }
}
