//! Loader for containers the host cannot decode natively.
//!
//! Streams the whole container through the codec bridge, merges the
//! per-chunk PCM into one contiguous buffer and resamples it to the render
//! device rate when the rates differ.
//!
//! Partial-failure policy: a decode fault mid-stream is recovered locally
//! when at least one chunk already decoded (the merged prefix is kept);
//! with zero decoded chunks it escalates as a `Decode` error.

use crate::cancel::CancellationToken;
use crate::error::{PlayerError, Result};
use crate::loader::{fetch_url, raw_data_bytes, LoadResult};
use crate::resample::resample_interleaved;
use crate::source::{SourceDescriptor, SourceKind};
use bridge_traits::audio::PcmBuffer;
use bridge_traits::http::HttpClient;
use bridge_traits::render::RenderDevice;
use bridge_traits::StreamDecoder;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct StreamDecodeLoader {
    decoder: Option<Arc<dyn StreamDecoder>>,
    http: Option<Arc<dyn HttpClient>>,
}

impl StreamDecodeLoader {
    pub fn new(decoder: Option<Arc<dyn StreamDecoder>>, http: Option<Arc<dyn HttpClient>>) -> Self {
        Self { decoder, http }
    }

    pub fn can_handle(&self, descriptor: &SourceDescriptor) -> bool {
        crate::source::classify(descriptor) == SourceKind::DecodeNeeded
            || descriptor.data.is_some()
    }

    pub async fn load(
        &self,
        descriptor: &SourceDescriptor,
        device: Option<&Arc<dyn RenderDevice>>,
        token: &CancellationToken,
    ) -> Result<LoadResult> {
        let decoder = self.decoder.as_ref().ok_or_else(|| {
            PlayerError::Unsupported("no stream decoder configured for this format".to_string())
        })?;

        let bytes = if descriptor.data.is_some() {
            raw_data_bytes(descriptor, token).await?
        } else if let Some(url) = descriptor.url.as_ref() {
            let http = self.http.as_ref().ok_or_else(|| {
                PlayerError::Unsupported("URL sources require an HTTP client".to_string())
            })?;
            fetch_url(http, descriptor, url, token).await?
        } else {
            return Err(PlayerError::InvalidArgument(
                "descriptor names neither a URL nor raw data".to_string(),
            ));
        };
        if token.is_cancelled() {
            return Err(PlayerError::Aborted);
        }

        let hint = descriptor.effective_hint();
        let mut session = {
            let decoder = Arc::clone(decoder);
            token
                .wrap(async move {
                    decoder
                        .open(bytes, hint.as_deref())
                        .await
                        .map_err(PlayerError::from_load_fault)
                })
                .await?
        };

        let info = session.info();
        let mut samples: Vec<f32> = Vec::new();
        let mut channels = info.channels;
        let mut sample_rate = info.sample_rate;
        let mut chunks_decoded = 0usize;

        loop {
            let chunk = token
                .wrap(async { session.next_chunk().await.map_err(PlayerError::from_load_fault) })
                .await;
            match chunk {
                Ok(Some(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    if chunks_decoded == 0 {
                        channels = chunk.channels;
                        sample_rate = chunk.sample_rate;
                    }
                    samples.extend(chunk.samples);
                    chunks_decoded += 1;
                }
                Ok(None) => break,
                Err(err) if err.is_abort() => return Err(err),
                Err(err) => {
                    // Recoverable only when a usable prefix already decoded.
                    if chunks_decoded == 0 {
                        return Err(err);
                    }
                    warn!(
                        "stream decode failed after {chunks_decoded} chunks, keeping prefix: {err}"
                    );
                    break;
                }
            }
        }

        if samples.is_empty() || channels == 0 || sample_rate == 0 {
            return Err(PlayerError::Decode(
                "stream decode produced no audio frames".to_string(),
            ));
        }

        // Match the device rate so direct rendering needs no live
        // conversion.
        if let Some(device) = device {
            let target_rate = device.sample_rate();
            if target_rate != sample_rate {
                debug!("resampling merged PCM {sample_rate} Hz -> {target_rate} Hz");
                samples = resample_interleaved(samples, channels, sample_rate, target_rate)?;
                sample_rate = target_rate;
            }
        }
        if token.is_cancelled() {
            return Err(PlayerError::Aborted);
        }

        let buffer = PcmBuffer::new(samples, channels, sample_rate);
        let duration = buffer.duration_seconds();
        debug!(
            "stream decode merged {chunks_decoded} chunks into {} frames ({duration:.2}s)",
            buffer.frames()
        );
        Ok(LoadResult {
            buffer: Some(Arc::new(buffer)),
            duration: Some(duration),
            ..Default::default()
        })
    }
}

impl std::fmt::Debug for StreamDecodeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecodeLoader")
            .field("decoder", &self.decoder.is_some())
            .field("http", &self.http.is_some())
            .finish()
    }
}
