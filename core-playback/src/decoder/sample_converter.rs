//! # Sample Format Converter
//!
//! Converts audio samples between different formats and layouts.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Sample converter that normalizes audio to f32 interleaved format.
///
/// Symphonia outputs audio in various formats (i16, i24, i32, f32, f64)
/// and layouts (planar, interleaved). This converter normalizes everything
/// to interleaved f32 samples in the range [-1.0, 1.0].
pub struct SampleConverter;

impl SampleConverter {
    /// Convert a Symphonia `AudioBufferRef` to interleaved f32 samples.
    ///
    /// The output is always f32 in `[-1.0, 1.0]`, interleaved
    /// (LRLRLR... for stereo).
    pub fn to_interleaved_f32(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
        match buffer {
            AudioBufferRef::F32(buf) => Self::convert_and_interleave(&**buf, |s: f32| s),
            AudioBufferRef::F64(buf) => {
                Self::convert_and_interleave(&**buf, |s: f64| s.into_sample())
            }
            AudioBufferRef::S32(buf) => {
                Self::convert_and_interleave(&**buf, |s: i32| s.into_sample())
            }
            AudioBufferRef::S16(buf) => {
                Self::convert_and_interleave(&**buf, |s: i16| s.into_sample())
            }
            AudioBufferRef::S24(buf) => {
                Self::convert_and_interleave(&**buf, |s| IntoSample::into_sample(s))
            }
            AudioBufferRef::S8(buf) => Self::convert_and_interleave(&**buf, |s: i8| s.into_sample()),
            AudioBufferRef::U32(buf) => {
                Self::convert_and_interleave(&**buf, |s: u32| s.into_sample())
            }
            AudioBufferRef::U16(buf) => {
                Self::convert_and_interleave(&**buf, |s: u16| s.into_sample())
            }
            AudioBufferRef::U24(buf) => {
                Self::convert_and_interleave(&**buf, |s| IntoSample::into_sample(s))
            }
            AudioBufferRef::U8(buf) => Self::convert_and_interleave(&**buf, |s: u8| s.into_sample()),
        }
    }

    /// Convert and interleave samples of any type.
    fn convert_and_interleave<T>(buf: &AudioBuffer<T>, convert: fn(T) -> f32) -> Vec<f32>
    where
        T: Sample + Copy,
    {
        let num_channels = buf.spec().channels.count();
        let num_frames = buf.frames();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for chan_idx in 0..num_channels {
                let plane = buf.chan(chan_idx);
                interleaved.push(convert(plane[frame_idx]));
            }
        }

        interleaved
    }
}
