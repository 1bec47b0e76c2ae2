//! Media-element backend: delegates rendering to a host element.
//!
//! Position, volume, rate and loop map directly onto element properties,
//! and the element's native events are re-emitted verbatim on the
//! normalized stream. Readiness is not assumed: a freshly assigned URL
//! must go through element load and produce a metadata/can-play signal
//! (or a mapped media error), while an element pre-attached by a streaming
//! loader may already be past that point.

use crate::backend::{BackendEvent, BackendEventSender};
use crate::error::{PlayerError, Result};
use crate::types::{PlaybackRate, Volume};
use bridge_traits::media::{
    ElementEvent, MediaBridge, MediaElement, MediaErrorKind, MediaReadyState,
};
use bridge_traits::render::{RenderDevice, StageId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// How the backend obtains its element.
pub enum ElementSource {
    /// Element already carrying a source (blob-sourced or attached by the
    /// adaptive engine).
    PreAttached(Arc<dyn MediaElement>),
    /// Fresh element pointed at a URL; must load and await readiness.
    Url {
        bridge: Arc<dyn MediaBridge>,
        url: String,
    },
}

pub struct MediaElementBackend {
    inner: Arc<Inner>,
}

struct Inner {
    element: Arc<dyn MediaElement>,
    events: BackendEventSender,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    media_stage: Mutex<Option<(Arc<dyn RenderDevice>, StageId)>>,
    playing: AtomicBool,
    disposed: AtomicBool,
}

impl MediaElementBackend {
    /// Prepare the element and wait until it is ready to play.
    pub async fn initialize(
        source: ElementSource,
        events: BackendEventSender,
        volume: Volume,
        muted: bool,
        rate: PlaybackRate,
        looping: bool,
        readiness_timeout: Duration,
    ) -> Result<Self> {
        let element: Arc<dyn MediaElement> = match &source {
            ElementSource::PreAttached(element) => Arc::clone(element),
            ElementSource::Url { bridge, .. } => bridge
                .create_element()
                .map_err(PlayerError::from_load_fault)?,
        };

        // Subscribe before kicking off the load so the readiness event
        // cannot slip past.
        let mut readiness_events = element.subscribe();

        let needs_wait = match source {
            ElementSource::PreAttached(_) => {
                element.ready_state() < MediaReadyState::HaveMetadata
            }
            ElementSource::Url { url, .. } => {
                element.set_source(&url).map_err(PlayerError::from_load_fault)?;
                element.begin_load().map_err(PlayerError::from_load_fault)?;
                true
            }
        };

        if needs_wait {
            Self::await_readiness(&element, &mut readiness_events, readiness_timeout).await?;
        }

        element.set_volume(if muted { 0.0 } else { volume.value() });
        element.set_muted(muted);
        element.set_rate(rate.value());
        element.set_looping(looping);

        let inner = Arc::new(Inner {
            element,
            events,
            forwarder: Mutex::new(None),
            media_stage: Mutex::new(None),
            playing: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        });
        inner.spawn_forwarder();
        debug!(
            "media-element backend ready, source {:?}",
            inner.element.current_source()
        );
        Ok(Self { inner })
    }

    /// Wait for metadata/can-play, mapping native media errors.
    async fn await_readiness(
        element: &Arc<dyn MediaElement>,
        events: &mut broadcast::Receiver<ElementEvent>,
        timeout: Duration,
    ) -> Result<()> {
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(ElementEvent::LoadedMetadata) | Ok(ElementEvent::CanPlay) => {
                        return Ok(());
                    }
                    Ok(ElementEvent::Error(kind)) => {
                        return Err(map_media_error(kind, element.last_error()));
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Readiness may have happened inside the missed
                        // window.
                        if element.ready_state() >= MediaReadyState::HaveMetadata {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(PlayerError::Internal(
                            "element event stream closed before readiness".to_string(),
                        ));
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PlayerError::Network(format!(
                "element did not become ready within {timeout:?}"
            ))),
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.inner.disposed.load(Ordering::SeqCst)
            && self.inner.element.ready_state() >= MediaReadyState::HaveMetadata
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    pub fn duration(&self) -> Option<f64> {
        self.inner.element.duration()
    }

    pub async fn play(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(PlayerError::PlaybackFailed("backend disposed".to_string()));
        }
        self.inner
            .element
            .play()
            .await
            .map_err(PlayerError::from_playback_fault)?;
        self.inner.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.inner
            .element
            .pause()
            .map_err(PlayerError::from_playback_fault)?;
        self.inner.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.pause()?;
        self.inner
            .element
            .set_position(0.0)
            .map_err(PlayerError::from_playback_fault)
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.inner
            .element
            .set_position(seconds.max(0.0))
            .map_err(PlayerError::from_playback_fault)
    }

    pub fn current_time(&self) -> f64 {
        self.inner.element.position()
    }

    pub fn set_volume(&self, volume: Volume) {
        self.inner.element.set_volume(volume.value());
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.element.set_muted(muted);
    }

    pub fn set_rate(&self, rate: PlaybackRate) {
        self.inner.element.set_rate(rate.value());
    }

    pub fn set_loop(&self, looping: bool) {
        self.inner.element.set_looping(looping);
    }

    /// Tap the element output into the render graph, when a device exists.
    pub fn connect_to_render_graph(
        &self,
        device: Option<&Arc<dyn RenderDevice>>,
    ) -> Result<Option<StageId>> {
        let Some(device) = device else {
            return Ok(None);
        };
        let mut media_stage = self.inner.media_stage.lock();
        if let Some((_, stage)) = media_stage.as_ref() {
            return Ok(Some(*stage));
        }
        let stage = device
            .create_media_source(self.inner.element.id())
            .map_err(PlayerError::from_load_fault)?;
        *media_stage = Some((Arc::clone(device), stage));
        Ok(Some(stage))
    }

    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = inner.forwarder.lock().take() {
            handle.abort();
        }
        if let Some((device, stage)) = inner.media_stage.lock().take() {
            let _ = device.disconnect(stage);
            let _ = device.release_stage(stage);
        }
        let _ = inner.element.pause();
        inner.element.release();
        debug!("media-element backend disposed");
    }
}

impl Inner {
    /// Re-emit the element's native events on the normalized stream.
    fn spawn_forwarder(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut events = self.element.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                if inner.disposed.load(Ordering::SeqCst) {
                    break;
                }

                let mapped = match event {
                    ElementEvent::Play => Some(BackendEvent::Play),
                    ElementEvent::Playing => {
                        inner.playing.store(true, Ordering::SeqCst);
                        Some(BackendEvent::Playing)
                    }
                    ElementEvent::Pause => {
                        inner.playing.store(false, Ordering::SeqCst);
                        Some(BackendEvent::Pause)
                    }
                    ElementEvent::Ended => {
                        inner.playing.store(false, Ordering::SeqCst);
                        Some(BackendEvent::Ended)
                    }
                    ElementEvent::TimeUpdate => {
                        Some(BackendEvent::TimeUpdate(inner.element.position()))
                    }
                    ElementEvent::DurationChange => inner
                        .element
                        .duration()
                        .map(BackendEvent::DurationChange),
                    ElementEvent::Waiting => Some(BackendEvent::Waiting),
                    ElementEvent::Progress => Some(BackendEvent::Progress),
                    ElementEvent::Error(kind) => Some(BackendEvent::Error(map_media_error(
                        kind,
                        inner.element.last_error(),
                    ))),
                    // Readiness was handled during initialize.
                    ElementEvent::LoadedMetadata | ElementEvent::CanPlay => None,
                };
                if let Some(event) = mapped {
                    if inner.events.send(event).is_err() {
                        break;
                    }
                }
            }
        });
        *self.forwarder.lock() = Some(handle);
    }
}

/// Map a native media error onto the engine taxonomy.
fn map_media_error(kind: MediaErrorKind, detail: Option<MediaErrorKind>) -> PlayerError {
    let kind = detail.unwrap_or(kind);
    match kind {
        MediaErrorKind::Aborted => PlayerError::Aborted,
        MediaErrorKind::Network => PlayerError::Network("media element network fault".to_string()),
        MediaErrorKind::Decode => PlayerError::Decode("media element decode fault".to_string()),
        MediaErrorKind::SrcNotSupported => {
            PlayerError::Decode("media element cannot play this source".to_string())
        }
    }
}

impl Drop for MediaElementBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for MediaElementBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaElementBackend")
            .field("element", &self.inner.element.id())
            .field("playing", &self.is_playing())
            .finish()
    }
}
