//! # Player Configuration
//!
//! Builder for the dependencies and settings the player is constructed
//! with.
//!
//! ## Overview
//!
//! The configuration enforces fail-fast validation: a player cannot be
//! built without at least one rendering path (a render device for decoded
//! playback, or a media bridge for element playback), and the error names
//! the missing capability. Everything else has sensible defaults.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::config::PlayerConfig;
//! use std::sync::Arc;
//!
//! let config = PlayerConfig::builder()
//!     .render_device(Arc::new(MyDevice::new()))
//!     .http_client(Arc::new(MyHttpClient::new()))
//!     .autoplay(false)
//!     .build()?;
//! ```

use crate::types::{PlaybackMode, PlaybackRate, Volume};
use bridge_traits::http::HttpClient;
use bridge_traits::media::MediaBridge;
use bridge_traits::render::RenderDevice;
use bridge_traits::stream::AdaptiveEngine;
use bridge_traits::StreamDecoder;
use core_runtime::error::{Error, Result};
use core_runtime::logging::LogHandle;
use std::sync::Arc;
use std::time::Duration;

/// Default wait for element/manifest readiness before a load fails.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(15);

/// Validated player configuration. Use [`PlayerConfig::builder`].
#[derive(Clone)]
pub struct PlayerConfig {
    /// Render device for decoded playback and the signal chain.
    pub device: Option<Arc<dyn RenderDevice>>,
    /// Media bridge for element playback and blob URLs.
    pub media: Option<Arc<dyn MediaBridge>>,
    /// HTTP client for source fetching.
    pub http: Option<Arc<dyn HttpClient>>,
    /// Codec bridge for formats the device cannot decode.
    pub decoder: Option<Arc<dyn StreamDecoder>>,
    /// Adaptive-streaming engine.
    pub adaptive: Option<Arc<dyn AdaptiveEngine>>,
    /// Observability handle injected into the engine components.
    pub log: LogHandle,
    /// Backend selection preference.
    pub mode: PlaybackMode,
    /// Start playback automatically after a successful load.
    pub autoplay: bool,
    /// Initial volume.
    pub volume: Volume,
    /// Initial mute flag.
    pub muted: bool,
    /// Initial playback rate.
    pub rate: PlaybackRate,
    /// Initial loop flag.
    pub looping: bool,
    /// Wait budget for readiness events during loads.
    pub readiness_timeout: Duration,
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }
}

impl std::fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("device", &self.device.as_ref().map(|_| "RenderDevice { ... }"))
            .field("media", &self.media.as_ref().map(|_| "MediaBridge { ... }"))
            .field("http", &self.http.as_ref().map(|_| "HttpClient { ... }"))
            .field("decoder", &self.decoder.as_ref().map(|_| "StreamDecoder { ... }"))
            .field("adaptive", &self.adaptive.as_ref().map(|_| "AdaptiveEngine { ... }"))
            .field("mode", &self.mode)
            .field("autoplay", &self.autoplay)
            .field("readiness_timeout", &self.readiness_timeout)
            .finish()
    }
}

/// Builder for [`PlayerConfig`].
#[derive(Default)]
pub struct PlayerConfigBuilder {
    device: Option<Arc<dyn RenderDevice>>,
    media: Option<Arc<dyn MediaBridge>>,
    http: Option<Arc<dyn HttpClient>>,
    decoder: Option<Arc<dyn StreamDecoder>>,
    adaptive: Option<Arc<dyn AdaptiveEngine>>,
    log: Option<LogHandle>,
    mode: PlaybackMode,
    autoplay: bool,
    volume: Option<Volume>,
    muted: bool,
    rate: Option<PlaybackRate>,
    looping: bool,
    readiness_timeout: Option<Duration>,
}

impl PlayerConfigBuilder {
    pub fn render_device(mut self, device: Arc<dyn RenderDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn media_bridge(mut self, media: Arc<dyn MediaBridge>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn stream_decoder(mut self, decoder: Arc<dyn StreamDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn adaptive_engine(mut self, adaptive: Arc<dyn AdaptiveEngine>) -> Self {
        self.adaptive = Some(adaptive);
        self
    }

    pub fn log_handle(mut self, log: LogHandle) -> Self {
        self.log = Some(log);
        self
    }

    pub fn mode(mut self, mode: PlaybackMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn volume(mut self, volume: Volume) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn playback_rate(mut self, rate: PlaybackRate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = Some(timeout);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Fails with `CapabilityMissing` when neither a render device nor a
    /// media bridge is provided, and with `Config` for a zero readiness
    /// timeout.
    pub fn build(self) -> Result<PlayerConfig> {
        if self.device.is_none() && self.media.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "RenderDevice | MediaBridge".to_string(),
                message: "No rendering path configured. Provide a render device for \
                          decoded playback, a media bridge for element playback, or both."
                    .to_string(),
            });
        }

        let readiness_timeout = self.readiness_timeout.unwrap_or(DEFAULT_READINESS_TIMEOUT);
        if readiness_timeout.is_zero() {
            return Err(Error::Config(
                "readiness_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(PlayerConfig {
            device: self.device,
            media: self.media,
            http: self.http,
            decoder: self.decoder,
            adaptive: self.adaptive,
            log: self.log.unwrap_or_default(),
            mode: self.mode,
            autoplay: self.autoplay,
            volume: self.volume.unwrap_or_default(),
            muted: self.muted,
            rate: self.rate.unwrap_or_default(),
            looping: self.looping,
            readiness_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_rendering_path() {
        let err = PlayerConfig::builder().build().unwrap_err();
        match err {
            Error::CapabilityMissing { capability, .. } => {
                assert!(capability.contains("RenderDevice"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_readiness_timeout_is_rejected() {
        // A media bridge alone satisfies the rendering-path requirement,
        // so only the timeout should fail here.
        struct NoopBridge;
        impl MediaBridge for NoopBridge {
            fn create_element(
                &self,
            ) -> bridge_traits::error::Result<Arc<dyn bridge_traits::media::MediaElement>>
            {
                Err(bridge_traits::BridgeError::NotAvailable("noop".into()))
            }
            fn create_blob_url(
                &self,
                _data: bytes::Bytes,
                _content_type: Option<&str>,
            ) -> bridge_traits::error::Result<String> {
                Err(bridge_traits::BridgeError::NotAvailable("noop".into()))
            }
            fn revoke_blob_url(&self, _url: &str) -> bridge_traits::error::Result<()> {
                Ok(())
            }
        }

        let err = PlayerConfig::builder()
            .media_bridge(Arc::new(NoopBridge))
            .readiness_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let ok = PlayerConfig::builder()
            .media_bridge(Arc::new(NoopBridge))
            .build()
            .unwrap();
        assert_eq!(ok.readiness_timeout, DEFAULT_READINESS_TIMEOUT);
        assert_eq!(ok.mode, PlaybackMode::Auto);
        assert!(!ok.autoplay);
    }
}
