//! Resampling for the stream-decode path.
//!
//! Decoded PCM is resampled to the render device rate before it is wrapped
//! into a playable buffer. Uses rubato's polynomial resampler, which is
//! plenty for rate adaptation of fully decoded material.

use crate::error::{PlayerError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

const CHUNK_FRAMES: usize = 1024;

/// Resample interleaved samples from `from_rate` to `to_rate`.
///
/// Returns the input unchanged when the rates already match.
///
/// # Errors
///
/// Fails with `Decode` when the resampler cannot be constructed or a
/// processing step fails (e.g. unsupported rate ratio).
pub fn resample_interleaved(
    samples: Vec<f32>,
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }
    if channels == 0 || from_rate == 0 || to_rate == 0 {
        return Err(PlayerError::Decode(format!(
            "cannot resample {channels}-channel audio from {from_rate} Hz to {to_rate} Hz"
        )));
    }

    let channels = channels as usize;
    let frames = samples.len() / channels;
    let ratio = to_rate as f64 / from_rate as f64;

    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 2.0, PolynomialDegree::Linear, CHUNK_FRAMES, channels)
            .map_err(|e| PlayerError::Decode(format!("resampler init failed: {e}")))?;

    // Deinterleave into per-channel planes.
    let mut planes: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }

    let mut out_planes: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut position = 0usize;
    while position < frames {
        let needed = resampler.input_frames_next();
        let take = needed.min(frames - position);
        let window: Vec<&[f32]> = planes
            .iter()
            .map(|plane| &plane[position..position + take])
            .collect();

        let produced = if take == needed {
            resampler.process(&window, None)
        } else {
            resampler.process_partial(Some(&window), None)
        }
        .map_err(|e| PlayerError::Decode(format!("resampling failed: {e}")))?;

        for (out, chunk) in out_planes.iter_mut().zip(produced) {
            out.extend(chunk);
        }
        position += take;
    }

    // Flush the resampler's internal delay line.
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| PlayerError::Decode(format!("resampler flush failed: {e}")))?;
    for (out, chunk) in out_planes.iter_mut().zip(tail) {
        out.extend(chunk);
    }

    // Reinterleave.
    let out_frames = out_planes.first().map(|p| p.len()).unwrap_or(0);
    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for plane in &out_planes {
            interleaved.push(plane.get(frame).copied().unwrap_or(0.0));
        }
    }
    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_passthrough() {
        let samples = vec![0.1, -0.1, 0.2, -0.2];
        let out = resample_interleaved(samples.clone(), 2, 44100, 44100).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn upsampling_roughly_doubles_frame_count() {
        // One second of a 440 Hz sine at 22.05 kHz, mono.
        let from_rate = 22050u32;
        let samples: Vec<f32> = (0..from_rate)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / from_rate as f32).sin())
            .collect();

        let out = resample_interleaved(samples, 1, from_rate, 44100).unwrap();
        let expected = 44100f64;
        let got = out.len() as f64;
        assert!(
            (got - expected).abs() / expected < 0.05,
            "expected ~{expected} frames, got {got}"
        );
    }

    #[test]
    fn zero_channel_input_is_rejected() {
        let result = resample_interleaved(vec![0.0; 8], 0, 44100, 48000);
        assert!(matches!(result, Err(PlayerError::Decode(_))));
    }
}
