//! Loader wrapping the external adaptive-streaming engine.
//!
//! Readiness requires BOTH "manifest parsed" and "media attached". The two
//! events race in either order, so the loader tracks both flags and
//! resolves exactly once when the second arrives, and never after
//! cancellation. Engine state is expensive, so the factory caches this
//! loader across loads; each load binds the engine to a fresh media
//! element.

use crate::cancel::CancellationToken;
use crate::error::{PlayerError, Result};
use crate::loader::{LoadResult, PlayableHandle};
use crate::source::{SourceDescriptor, SourceKind};
use crate::types::QualityLevel;
use bridge_traits::media::{MediaBridge, MediaElement};
use bridge_traits::render::RenderDevice;
use bridge_traits::stream::{AdaptiveEngine, AdaptiveErrorKind, AdaptiveEvent, StreamVariant};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AdaptiveLoader {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Option<Arc<dyn AdaptiveEngine>>,
    media: Option<Arc<dyn MediaBridge>>,
}

impl AdaptiveLoader {
    pub fn new(
        engine: Option<Arc<dyn AdaptiveEngine>>,
        media: Option<Arc<dyn MediaBridge>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner { engine, media }),
        }
    }

    /// Whether two clones wrap the same cached engine state.
    pub fn shares_state_with(&self, other: &AdaptiveLoader) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn can_handle(&self, descriptor: &SourceDescriptor) -> bool {
        crate::source::classify(descriptor) == SourceKind::AdaptiveStream
    }

    pub async fn load(
        &self,
        descriptor: &SourceDescriptor,
        _device: Option<&Arc<dyn RenderDevice>>,
        token: &CancellationToken,
    ) -> Result<LoadResult> {
        let engine = self.inner.engine.as_ref().ok_or_else(|| {
            PlayerError::Unsupported("no adaptive-streaming engine configured".to_string())
        })?;
        let media = self.inner.media.as_ref().ok_or_else(|| {
            PlayerError::Unsupported("adaptive sources require a media bridge".to_string())
        })?;
        let url = descriptor.url.as_ref().ok_or_else(|| {
            PlayerError::InvalidArgument("adaptive sources must name a manifest URL".to_string())
        })?;

        // A previous load may still hold the engine; rebinding starts clean.
        let _ = engine.detach();

        let element: Arc<dyn MediaElement> = media
            .create_element()
            .map_err(PlayerError::from_load_fault)?;

        // Subscribe before attach/load so neither readiness event can be
        // missed.
        let mut events = engine.subscribe();

        if let Err(err) = engine
            .attach(Arc::clone(&element))
            .and_then(|_| engine.load(url))
        {
            self.abandon(&element);
            return Err(PlayerError::from_load_fault(err));
        }

        match self.await_readiness(&mut events, token).await {
            Ok((variants, duration)) => {
                let duration = duration.or_else(|| element.duration());
                debug!(
                    "adaptive stream ready: {} variants, duration {:?}",
                    variants.len(),
                    duration
                );
                Ok(LoadResult {
                    handle: Some(PlayableHandle::Attached(element)),
                    duration,
                    quality_levels: variants.iter().map(Self::variant_to_level).collect(),
                    ..Default::default()
                })
            }
            Err(err) => {
                self.abandon(&element);
                Err(err)
            }
        }
    }

    /// Wait until both readiness flags are set, or fail.
    async fn await_readiness(
        &self,
        events: &mut broadcast::Receiver<AdaptiveEvent>,
        token: &CancellationToken,
    ) -> Result<(Vec<StreamVariant>, Option<f64>)> {
        let mut manifest_parsed = false;
        let mut media_attached = false;
        let mut variants: Vec<StreamVariant> = Vec::new();
        let mut duration: Option<f64> = None;

        loop {
            let event = tokio::select! {
                _ = token.cancelled() => return Err(PlayerError::Aborted),
                event = events.recv() => event,
            };
            // The token may have been reset while the event was in flight.
            if token.is_cancelled() {
                return Err(PlayerError::Aborted);
            }

            match event {
                Ok(AdaptiveEvent::ManifestParsed {
                    variants: parsed,
                    duration: parsed_duration,
                }) => {
                    manifest_parsed = true;
                    variants = parsed;
                    duration = parsed_duration;
                }
                Ok(AdaptiveEvent::MediaAttached) => {
                    media_attached = true;
                }
                Ok(AdaptiveEvent::Error {
                    fatal: true,
                    kind,
                    message,
                }) => {
                    return Err(match kind {
                        AdaptiveErrorKind::Network => PlayerError::Network(message),
                        AdaptiveErrorKind::Media | AdaptiveErrorKind::Other => {
                            PlayerError::Decode(message)
                        }
                    });
                }
                Ok(AdaptiveEvent::Error { fatal: false, message, .. }) => {
                    warn!("non-fatal adaptive engine fault during load: {message}");
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("adaptive event stream lagged by {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(PlayerError::Network(
                        "adaptive engine closed its event stream".to_string(),
                    ));
                }
            }

            if manifest_parsed && media_attached {
                return Ok((variants, duration));
            }
        }
    }

    fn abandon(&self, element: &Arc<dyn MediaElement>) {
        if let Some(engine) = self.inner.engine.as_ref() {
            let _ = engine.detach();
        }
        element.release();
    }

    fn variant_to_level(variant: &StreamVariant) -> QualityLevel {
        QualityLevel {
            index: variant.index,
            bitrate: variant.bitrate,
            label: variant.label.clone(),
        }
    }

    /// Ordered quality levels from the current manifest.
    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        self.inner
            .engine
            .as_ref()
            .map(|engine| engine.variants().iter().map(Self::variant_to_level).collect())
            .unwrap_or_default()
    }

    /// Select a quality level, or `None` for automatic selection.
    pub fn set_quality(&self, index: Option<usize>) -> Result<()> {
        let engine = self.inner.engine.as_ref().ok_or_else(|| {
            PlayerError::Unsupported("no adaptive-streaming engine configured".to_string())
        })?;
        if let Some(index) = index {
            let available = engine.variants().len();
            if index >= available {
                return Err(PlayerError::InvalidArgument(format!(
                    "quality index {index} out of range ({available} levels)"
                )));
            }
        }
        engine.set_variant(index).map_err(PlayerError::from_load_fault)
    }

    /// Currently locked-in quality level.
    pub fn current_quality(&self) -> Option<usize> {
        self.inner
            .engine
            .as_ref()
            .and_then(|engine| engine.current_variant())
    }

    /// Subscribe to engine lifecycle events (for mid-playback faults and
    /// variant switches).
    pub fn subscribe(&self) -> Option<broadcast::Receiver<AdaptiveEvent>> {
        self.inner.engine.as_ref().map(|engine| engine.subscribe())
    }

    /// Unbind the engine from its element.
    pub fn detach(&self) {
        if let Some(engine) = self.inner.engine.as_ref() {
            let _ = engine.detach();
        }
    }
}

impl std::fmt::Debug for AdaptiveLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveLoader")
            .field("engine", &self.inner.engine.is_some())
            .field("media", &self.inner.media.is_some())
            .finish()
    }
}
