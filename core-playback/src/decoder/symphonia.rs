//! # Symphonia Decoder Implementation
//!
//! Implements the [`StreamDecoder`] bridge over the Symphonia library.

use crate::decoder::SampleConverter;
use async_trait::async_trait;
use bridge_traits::decode::{DecodeSession, DecodedStreamInfo, PcmChunk, StreamDecoder};
use bridge_traits::error::{BridgeError, Result};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Consecutive corrupt packets tolerated before the stream is declared dead.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// [`StreamDecoder`] backed by Symphonia.
///
/// The adapter handles the full decode pipeline: format probing, container
/// demultiplexing, codec decoding and sample-format conversion. One
/// [`DecodeSession`] is produced per opened container; sessions are
/// independent and carry the whole decode state.
#[derive(Debug, Default, Clone)]
pub struct SymphoniaStreamDecoder;

impl SymphoniaStreamDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamDecoder for SymphoniaStreamDecoder {
    async fn open(&self, data: Bytes, format_hint: Option<&str>) -> Result<Box<dyn DecodeSession>> {
        let mut hint = Hint::new();
        if let Some(extension_or_mime) = format_hint {
            if extension_or_mime.contains('/') {
                hint.mime_type(extension_or_mime);
            } else {
                hint.with_extension(extension_or_mime);
            }
        }

        let cursor = Cursor::new(data.to_vec());
        let media_source = Box::new(cursor) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        let probe_result = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| BridgeError::Decode(format!("Failed to probe format: {}", e)))?;

        let format_reader = probe_result.format;

        // First audio track with a recognized codec.
        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| BridgeError::Decode("No supported audio tracks".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| BridgeError::Decode("Missing sample rate".to_string()))?;

        // Channel count may only be known after the first decode for some
        // codecs; default to stereo and correct from decoded packets.
        let channels = track
            .codec_params
            .channels
            .map(|ch| ch.count() as u16)
            .unwrap_or(2);

        let duration = track
            .codec_params
            .n_frames
            .map(|frames| frames as f64 / sample_rate as f64);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| BridgeError::Decode(format!("Failed to create codec decoder: {}", e)))?;

        debug!(
            "decode session opened: {}Hz, {} channels, duration {:?}",
            sample_rate, channels, duration
        );

        Ok(Box::new(SymphoniaSession {
            format_reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration,
            eof: false,
        }))
    }
}

struct SymphoniaSession {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    duration: Option<f64>,
    eof: bool,
}

impl SymphoniaSession {
    /// Read and decode the next packet, skipping corrupted ones up to the
    /// consecutive-error cap.
    fn decode_next_packet(&mut self) -> Result<Option<Vec<f32>>> {
        if self.eof {
            return Ok(None);
        }

        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => {
                    consecutive_errors = 0;
                    packet
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("decoder reset required for track list change");
                    return Err(BridgeError::Decode(
                        "Track list changed, reset required".to_string(),
                    ));
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.eof = true;
                    return Ok(None);
                }
                Err(e) => {
                    return Err(BridgeError::Decode(format!("Failed to read packet: {}", e)));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let decoded_channels = decoded.spec().channels.count() as u16;
                    if self.channels != decoded_channels {
                        debug!(
                            "updating channel count from {} to {}",
                            self.channels, decoded_channels
                        );
                        self.channels = decoded_channels;
                    }
                    return Ok(Some(SampleConverter::to_interleaved_f32(&decoded)));
                }
                Err(SymphoniaError::IoError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "skipping corrupted packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(BridgeError::Decode(format!(
                            "Stream corruption after {} failed packets",
                            MAX_CONSECUTIVE_ERRORS
                        )));
                    }
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(BridgeError::Decode(format!(
                            "Decoder failure after {} failed packets: {}",
                            MAX_CONSECUTIVE_ERRORS, err
                        )));
                    }
                }
                Err(e) => {
                    return Err(BridgeError::Decode(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl DecodeSession for SymphoniaSession {
    fn info(&self) -> DecodedStreamInfo {
        DecodedStreamInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            duration: self.duration,
            codec: None,
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<PcmChunk>> {
        let samples = match self.decode_next_packet()? {
            Some(samples) => samples,
            None => return Ok(None),
        };

        let frames = samples.len() / self.channels.max(1) as usize;
        Ok(Some(PcmChunk {
            samples,
            frames,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn truncated_container_fails_to_open() {
        // An MP3 sync word alone is not a probe-able stream.
        let decoder = SymphoniaStreamDecoder::new();
        let result = decoder
            .open(Bytes::from_static(&[0xFF, 0xFB, 0x90, 0x00]), Some("mp3"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn wav_container_decodes_to_pcm() {
        // Minimal 16-bit mono PCM WAV with 8 samples of a ramp.
        let mut wav: Vec<u8> = Vec::new();
        let samples: [i16; 8] = [0, 4096, 8192, 12288, 16384, 12288, 8192, 4096];
        let data_len = (samples.len() * 2) as u32;
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&44100u32.to_le_bytes());
        wav.extend_from_slice(&(44100u32 * 2).to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        let decoder = SymphoniaStreamDecoder::new();
        let mut session = decoder.open(Bytes::from(wav), Some("wav")).await.unwrap();

        let info = session.info();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 1);

        let mut decoded: Vec<f32> = Vec::new();
        while let Some(chunk) = session.next_chunk().await.unwrap() {
            assert_eq!(chunk.channels, 1);
            decoded.extend(chunk.samples);
        }
        assert_eq!(decoded.len(), 8);
        assert!(decoded[0].abs() < 1e-6);
        assert!(decoded[4] > 0.4);
    }
}
