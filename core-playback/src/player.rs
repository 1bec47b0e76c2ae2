//! Playback orchestrator.
//!
//! Wires the state machine, time controller, loader factory, backends and
//! signal chain behind one transport surface. `load` is fully re-entrant:
//! a new call bumps the cancellation-token generation, tears the previous
//! backend/loader/resources down completely and only then proceeds, so at
//! most one live backend/loader pair exists at any time.
//!
//! Every volume/rate/loop mutation propagates to the active backend, to
//! the time controller (rate/loop) and to the event registry; eventing is
//! not optional.

use crate::backend::{
    BackendEvent, DirectBufferBackend, ElementSource, MediaElementBackend, PlaybackBackend,
};
use crate::cancel::CancellationToken;
use crate::clock::TimeController;
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::events::{PlayerEvent, PlayerEventKind};
use crate::loader::{Loader, LoaderBridges, LoaderFactory, PlayableHandle, ResourceHandle};
use crate::signal::SignalChain;
use crate::source::{SourceDescriptor, SourceKind};
use crate::state::{PlayerState, StateManager};
use crate::types::{BackendKind, PlaybackMode, PlaybackRate, QualityLevel, Seconds, Volume};
use bridge_traits::media::MediaBridge;
use bridge_traits::render::RenderDevice;
use bridge_traits::stream::AdaptiveEvent;
use core_runtime::events::{EventRegistry, ListenerId};
use core_runtime::logging::LogHandle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Live backend/loader pair for the current source.
struct Session {
    backend: Arc<PlaybackBackend>,
    kind: BackendKind,
    loader: Loader,
    resources: Vec<ResourceHandle>,
    quality_levels: Vec<QualityLevel>,
    pump: JoinHandle<()>,
    engine_watch: Option<JoinHandle<()>>,
}

struct PlayerInner {
    device: Option<Arc<dyn RenderDevice>>,
    media: Option<Arc<dyn MediaBridge>>,
    log: LogHandle,
    mode: PlaybackMode,
    autoplay: bool,
    readiness_timeout: std::time::Duration,

    state: StateManager,
    time: Mutex<TimeController>,
    chain: Option<SignalChain>,
    factory: Mutex<LoaderFactory>,
    events: EventRegistry<PlayerEvent>,
    session: Mutex<Option<Session>>,
    token: Mutex<CancellationToken>,

    volume: Mutex<Volume>,
    muted: AtomicBool,
    rate: Mutex<PlaybackRate>,
    looping: AtomicBool,

    /// Fallback clock for element-only players without a render device.
    epoch: Instant,
    disposed: AtomicBool,
}

/// The audio player.
///
/// Cheap to clone handles are not provided on purpose: the player owns its
/// session exclusively. Reads (`state`, `current_time`, ...) are lock-free
/// or take short internal locks and are safe from event listeners;
/// listeners must not re-enter `load`/`dispose`.
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl Player {
    /// Build a player from a validated configuration.
    ///
    /// # Errors
    ///
    /// Fails when the signal chain cannot be constructed on the supplied
    /// render device.
    pub fn new(config: PlayerConfig) -> Result<Self> {
        let chain = match &config.device {
            Some(device) => Some(SignalChain::new(Arc::clone(device))?),
            None => None,
        };

        let bridges = LoaderBridges {
            http: config.http.clone(),
            media: config.media.clone(),
            decoder: config.decoder.clone(),
            adaptive: config.adaptive.clone(),
        };

        let inner = Arc::new(PlayerInner {
            device: config.device,
            media: config.media,
            log: config.log.clone(),
            mode: config.mode,
            autoplay: config.autoplay,
            readiness_timeout: config.readiness_timeout,
            state: StateManager::new(config.log.clone()),
            time: Mutex::new(TimeController::new()),
            chain,
            factory: Mutex::new(LoaderFactory::new(bridges)),
            events: EventRegistry::new(config.log),
            session: Mutex::new(None),
            token: Mutex::new(CancellationToken::new()),
            volume: Mutex::new(config.volume),
            muted: AtomicBool::new(config.muted),
            rate: Mutex::new(config.rate),
            looping: AtomicBool::new(config.looping),
            epoch: Instant::now(),
            disposed: AtomicBool::new(false),
        });

        // Forward committed transitions as statechange events.
        let weak = Arc::downgrade(&inner);
        inner.state.on_transition(move |transition| {
            if let Some(inner) = weak.upgrade() {
                inner.emit(PlayerEvent::StateChange {
                    from: transition.from,
                    to: transition.to,
                });
            }
        });

        Ok(Self { inner })
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load a source, cancelling and cleaning up any previous one first.
    ///
    /// # Errors
    ///
    /// `Aborted` when superseded by a newer `load` (silent, no `error`
    /// event); Network/Decode/Unsupported faults otherwise, which also
    /// transition the player to the error state and emit an `error` event.
    pub async fn load(&self, descriptor: SourceDescriptor) -> Result<()> {
        let inner = &self.inner;
        if inner.disposed.load(Ordering::SeqCst) {
            return Err(PlayerError::InvalidArgument(
                "player is disposed".to_string(),
            ));
        }
        if !descriptor.is_meaningful() {
            return Err(PlayerError::InvalidArgument(
                "source descriptor names neither a URL nor raw data".to_string(),
            ));
        }

        // Generation bump: any in-flight load observes cancellation at its
        // next suspension point.
        let token = {
            let mut guard = inner.token.lock();
            let fresh = guard.reset();
            *guard = fresh.clone();
            fresh
        };

        inner.cleanup_session();
        inner.state.reset();
        inner.state.transition(PlayerState::Loading);
        inner.emit(PlayerEvent::LoadStart);

        match self.load_pipeline(&descriptor, &token).await {
            Ok(()) => Ok(()),
            Err(err) => Err(inner.fail_load(err, &token)),
        }
    }

    async fn load_pipeline(
        &self,
        descriptor: &SourceDescriptor,
        token: &CancellationToken,
    ) -> Result<()> {
        let inner = &self.inner;

        let (kind, loader, recommended) = {
            let mut factory = inner.factory.lock();
            let kind = factory.classify(descriptor);
            if kind == SourceKind::Unsupported {
                return Err(PlayerError::Unsupported(format!(
                    "no loader available for source {:?}",
                    descriptor.effective_hint()
                )));
            }
            let loader = factory.loader_for(kind)?;
            (kind, loader, factory.recommend_strategy(descriptor))
        };

        let strategy = match inner.mode {
            PlaybackMode::Auto => recommended,
            PlaybackMode::ForceBuffer => BackendKind::DirectBuffer,
            PlaybackMode::ForceElement => BackendKind::MediaElement,
        };
        // The loader decodes exactly when it receives a device.
        let device_arg = match strategy {
            BackendKind::DirectBuffer => inner.device.as_ref(),
            BackendKind::MediaElement => None,
        };
        info!("loading {kind:?} source via {strategy:?} strategy");

        let result = loader.load(descriptor, device_arg, token).await?;
        if token.is_cancelled() {
            inner.release_resources(&result.resources);
            return Err(PlayerError::Aborted);
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel::<BackendEvent>();
        let volume = *inner.volume.lock();
        let muted = inner.muted.load(Ordering::SeqCst);
        let rate = *inner.rate.lock();
        let looping = inner.looping.load(Ordering::SeqCst);

        // Forced fallback: decoded PCM can only be rendered directly.
        let backend = if let Some(buffer) = result.buffer.clone() {
            let device = inner.device.clone().ok_or_else(|| {
                PlayerError::Unsupported(
                    "decoded buffers require a render device".to_string(),
                )
            })?;
            PlaybackBackend::DirectBuffer(DirectBufferBackend::new(
                device,
                buffer,
                event_tx.clone(),
                volume,
                muted,
                rate,
                looping,
            )?)
        } else {
            let handle = result.handle.clone().ok_or_else(|| {
                PlayerError::Internal(
                    "loader produced neither a buffer nor a playable handle".to_string(),
                )
            })?;
            let source = match handle {
                PlayableHandle::Attached(element) => ElementSource::PreAttached(element),
                PlayableHandle::Url(url) => ElementSource::Url {
                    bridge: inner.media.clone().ok_or_else(|| {
                        PlayerError::Unsupported(
                            "playable handles require a media bridge".to_string(),
                        )
                    })?,
                    url,
                },
            };
            let initialized = token
                .wrap(MediaElementBackend::initialize(
                    source,
                    event_tx.clone(),
                    volume,
                    muted,
                    rate,
                    looping,
                    inner.readiness_timeout,
                ))
                .await;
            match initialized {
                Ok(backend) => PlaybackBackend::MediaElement(backend),
                Err(err) => {
                    inner.release_resources(&result.resources);
                    return Err(err);
                }
            }
        };

        if token.is_cancelled() {
            backend.dispose();
            inner.release_resources(&result.resources);
            return Err(PlayerError::Aborted);
        }

        // Wire the backend output through the signal chain.
        if let Some(chain) = &inner.chain {
            if let Some(stage) = backend.connect_to_render_graph(inner.device.as_ref())? {
                if let Some(device) = &inner.device {
                    device
                        .connect(stage, chain.input_stage())
                        .map_err(PlayerError::from_load_fault)?;
                }
            }
        }

        let duration = backend.duration().or(result.duration).unwrap_or(0.0);
        {
            let mut time = inner.time.lock();
            *time = TimeController::new();
            time.set_duration(duration);
            time.set_loop(looping);
            time.set_playback_rate(0.0, rate);
            time.on_start(0.0);
        }

        let backend = Arc::new(backend);
        let backend_kind = backend.kind();
        let pump = inner.spawn_event_pump(event_rx, backend_kind);
        let engine_watch = match &loader {
            Loader::Adaptive(adaptive) => inner.spawn_engine_watch(adaptive.subscribe()),
            _ => None,
        };

        let quality_levels = result.quality_levels.clone();
        *inner.session.lock() = Some(Session {
            backend,
            kind: backend_kind,
            loader,
            resources: result.resources,
            quality_levels: quality_levels.clone(),
            pump,
            engine_watch,
        });

        inner.state.transition(PlayerState::Ready);
        inner.emit(PlayerEvent::LoadedMetadata { duration });
        inner.emit(PlayerEvent::DurationChange { duration });
        if backend_kind == BackendKind::DirectBuffer {
            // Fully decoded in memory: buffered in one step.
            inner.emit(PlayerEvent::Buffered);
        }
        inner.emit(PlayerEvent::CanPlay);
        if !quality_levels.is_empty() {
            inner.emit(PlayerEvent::QualitiesAvailable {
                levels: quality_levels,
            });
        }
        debug!("load complete: {backend_kind:?} backend, duration {duration:.2}s");

        if inner.autoplay {
            self.play().await?;
        }
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start or resume playback.
    ///
    /// # Errors
    ///
    /// `PlaybackRejected` when the host refuses to start; the optimistic
    /// state transition is reverted and the fault is also emitted as an
    /// `error` event.
    pub async fn play(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.disposed.load(Ordering::SeqCst) {
            return Err(PlayerError::InvalidArgument(
                "player is disposed".to_string(),
            ));
        }
        let previous = inner.state.current();
        if previous == PlayerState::Playing {
            return Ok(());
        }
        if !previous.is_playable() {
            return Err(PlayerError::PlaybackFailed(format!(
                "cannot play from {previous:?} state"
            )));
        }
        let backend = inner
            .active_backend()
            .ok_or_else(|| PlayerError::PlaybackFailed("no source loaded".to_string()))?;

        inner.state.transition(PlayerState::Playing);
        match backend.play().await {
            Ok(()) => {
                let clock = inner.clock_now();
                inner.time.lock().set_anchor(clock);
                inner.emit(PlayerEvent::Play);
                Ok(())
            }
            Err(err) => {
                // Revert the optimistic transition; committed playback
                // state is otherwise untouched.
                inner.state.transition(previous);
                inner.emit_error(&err);
                Err(err)
            }
        }
    }

    /// Pause playback, freezing the position. No-op when not active.
    pub fn pause(&self) -> Result<()> {
        let inner = &self.inner;
        if !inner.state.current().is_active() {
            return Ok(());
        }
        let Some(backend) = inner.active_backend() else {
            return Ok(());
        };
        let clock = inner.clock_now();
        let position = inner.time.lock().pause_at(clock);
        backend.pause()?;
        inner.state.transition(PlayerState::Paused);
        inner.emit(PlayerEvent::Pause);
        debug!("paused at {position:.3}s");
        Ok(())
    }

    /// Halt playback and reset the position to zero.
    pub fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        let Some(backend) = inner.active_backend() else {
            return Ok(());
        };
        if !inner.state.current().is_playable() {
            return Ok(());
        }
        backend.stop()?;
        inner.time.lock().seek(0.0);
        inner.transition_to_ready();
        inner.emit(PlayerEvent::Stop);
        Ok(())
    }

    /// Seek to an absolute position in seconds (clamped to the duration).
    pub fn seek(&self, seconds: f64) -> Result<()> {
        let inner = &self.inner;
        let seconds = Seconds::new(seconds)?.value();
        if !inner.state.current().is_playable() {
            return Err(PlayerError::PlaybackFailed(
                "cannot seek with no playable source".to_string(),
            ));
        }
        let backend = inner
            .active_backend()
            .ok_or_else(|| PlayerError::PlaybackFailed("no source loaded".to_string()))?;

        let was_active = inner.state.current().is_active();
        let position = inner.time.lock().seek(seconds);
        inner.emit(PlayerEvent::Seeking { position });
        backend.seek(position)?;
        if was_active {
            let clock = inner.clock_now();
            inner.time.lock().set_anchor(clock);
        }
        inner.emit(PlayerEvent::Seeked { position });
        inner.emit(PlayerEvent::TimeUpdate { position });
        Ok(())
    }

    /// Seek to a percentage of the duration (`0.0..=100.0`).
    pub fn seek_percent(&self, percent: f64) -> Result<()> {
        let percent = Seconds::new(percent)?.value();
        let duration = self.inner.time.lock().duration();
        self.seek(duration * (percent.clamp(0.0, 100.0) / 100.0))
    }

    // ========================================================================
    // Volume / rate / loop
    // ========================================================================

    /// Set the volume (clamped to `[0.0, 1.0]`).
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        let inner = &self.inner;
        let volume = Volume::new(volume)?;
        *inner.volume.lock() = volume;
        if let Some(backend) = inner.active_backend() {
            backend.set_volume(volume);
        }
        inner.emit(PlayerEvent::VolumeChange {
            volume: volume.value(),
            muted: inner.muted.load(Ordering::SeqCst),
        });
        Ok(())
    }

    pub fn set_muted(&self, muted: bool) {
        let inner = &self.inner;
        inner.muted.store(muted, Ordering::SeqCst);
        if let Some(backend) = inner.active_backend() {
            backend.set_muted(muted);
        }
        inner.emit(PlayerEvent::VolumeChange {
            volume: inner.volume.lock().value(),
            muted,
        });
    }

    pub fn toggle_mute(&self) {
        let muted = self.inner.muted.load(Ordering::SeqCst);
        self.set_muted(!muted);
    }

    /// Set the playback rate.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for negative or non-finite rates; nothing changes
    /// in that case.
    pub fn set_playback_rate(&self, rate: f32) -> Result<()> {
        let inner = &self.inner;
        let rate = PlaybackRate::new(rate)?;
        *inner.rate.lock() = rate;
        if let Some(backend) = inner.active_backend() {
            backend.set_rate(rate);
        }
        let clock = inner.clock_now();
        inner.time.lock().set_playback_rate(clock, rate);
        inner.emit(PlayerEvent::RateChange { rate: rate.value() });
        Ok(())
    }

    pub fn set_loop(&self, looping: bool) {
        let inner = &self.inner;
        inner.looping.store(looping, Ordering::SeqCst);
        if let Some(backend) = inner.active_backend() {
            backend.set_loop(looping);
        }
        inner.time.lock().set_loop(looping);
        inner.emit(PlayerEvent::LoopChange { looping });
    }

    // ========================================================================
    // Quality negotiation
    // ========================================================================

    /// Ordered quality levels of the current source (empty for
    /// non-adaptive sources).
    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|session| session.quality_levels.clone())
            .unwrap_or_default()
    }

    /// Select a quality level by index, or `None` for automatic selection.
    pub fn set_quality(&self, index: Option<usize>) -> Result<()> {
        let loader = {
            let session = self.inner.session.lock();
            match session.as_ref().map(|s| &s.loader) {
                Some(Loader::Adaptive(adaptive)) => adaptive.clone(),
                _ => {
                    return Err(PlayerError::Unsupported(
                        "no adaptive source loaded".to_string(),
                    ))
                }
            }
        };
        loader.set_quality(index)
    }

    /// Currently locked-in quality level, when one is selected.
    pub fn current_quality(&self) -> Option<usize> {
        let session = self.inner.session.lock();
        match session.as_ref().map(|s| &s.loader) {
            Some(Loader::Adaptive(adaptive)) => adaptive.current_quality(),
            _ => None,
        }
    }

    // ========================================================================
    // Read-only surface
    // ========================================================================

    pub fn state(&self) -> PlayerState {
        self.inner.state.current()
    }

    pub fn duration(&self) -> f64 {
        self.inner.time.lock().duration()
    }

    /// Authoritative playback position, reconstructed from the render
    /// clock. Never polled by a timer.
    pub fn current_time(&self) -> f64 {
        let clock = self.inner.clock_now();
        self.inner.time.lock().compute(clock)
    }

    pub fn volume(&self) -> f32 {
        self.inner.volume.lock().value()
    }

    pub fn muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst)
    }

    pub fn playback_rate(&self) -> f32 {
        self.inner.rate.lock().value()
    }

    pub fn looping(&self) -> bool {
        self.inner.looping.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.current() == PlayerState::Playing
    }

    /// Rendering strategy of the active backend.
    pub fn mode(&self) -> Option<BackendKind> {
        self.inner.session.lock().as_ref().map(|s| s.kind)
    }

    /// The post-render signal chain, when a render device is configured.
    pub fn signal_chain(&self) -> Option<&SignalChain> {
        self.inner.chain.as_ref()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Listen for one event kind.
    pub fn on<F>(&self, kind: PlayerEventKind, callback: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, callback)
    }

    /// Listen for every event.
    pub fn on_any<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on_any(callback)
    }

    /// Remove a listener.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release everything. Terminal and idempotent: the second call is a
    /// silent no-op and emits nothing.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.token.lock().cancel();
        inner.cleanup_session();
        inner.factory.lock().dispose();
        if let Some(chain) = &inner.chain {
            chain.dispose();
        }
        inner.state.dispose();
        inner.emit(PlayerEvent::Dispose);
        inner.events.clear();
        info!("player disposed");
    }
}

impl PlayerInner {
    fn clock_now(&self) -> f64 {
        match &self.device {
            Some(device) => device.clock_seconds(),
            None => self.epoch.elapsed().as_secs_f64(),
        }
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.emit(&event);
    }

    fn emit_error(&self, err: &PlayerError) {
        self.emit(PlayerEvent::Error {
            code: err.code(),
            message: err.to_string(),
        });
    }

    fn active_backend(&self) -> Option<Arc<PlaybackBackend>> {
        self.session.lock().as_ref().map(|s| Arc::clone(&s.backend))
    }

    /// Normalize a load-phase failure.
    ///
    /// A stale (superseded) load must not mutate the state the newer load
    /// now owns, so `Aborted` and any fault observed under a cancelled
    /// token pass through silently.
    fn fail_load(&self, err: PlayerError, token: &CancellationToken) -> PlayerError {
        if err.is_abort() || token.is_cancelled() {
            debug!(
                "load generation {} ended after cancellation",
                token.generation()
            );
            return PlayerError::Aborted;
        }
        // A refused autoplay start is a playback fault: play() has already
        // reverted its optimistic transition and emitted the error.
        if matches!(
            err,
            PlayerError::PlaybackRejected(_) | PlayerError::PlaybackFailed(_)
        ) {
            return err;
        }
        self.state.transition(PlayerState::Error);
        self.emit_error(&err);
        err
    }

    /// `stop`/`ended` path to Ready; the table has no buffering->ready
    /// edge, so buffering legs through paused first.
    fn transition_to_ready(&self) {
        if self.state.current() == PlayerState::Buffering {
            self.state.transition(PlayerState::Paused);
        }
        self.state.transition(PlayerState::Ready);
    }

    fn release_resources(&self, resources: &[ResourceHandle]) {
        for resource in resources {
            match resource {
                ResourceHandle::BlobUrl(url) => {
                    if let Some(media) = &self.media {
                        if let Err(err) = media.revoke_blob_url(url) {
                            self.log
                                .warn("player", format!("failed to revoke blob url: {err}"));
                        }
                    }
                }
            }
        }
    }

    fn cleanup_session(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };
        session.pump.abort();
        if let Some(watch) = session.engine_watch {
            watch.abort();
        }
        session.backend.dispose();
        session.loader.dispose();
        self.release_resources(&session.resources);
        debug!("previous session cleaned up");
    }

    /// Drain normalized backend events into transitions + player events.
    fn spawn_event_pump(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<BackendEvent>,
        backend_kind: BackendKind,
    ) -> JoinHandle<()> {
        let weak: Weak<PlayerInner> = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_backend_event(backend_kind, event);
            }
        })
    }

    fn handle_backend_event(&self, backend_kind: BackendKind, event: BackendEvent) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        match event {
            BackendEvent::Play => {
                // Spontaneous element start (e.g. host UI); our own play()
                // already moved the state machine.
                let state = self.state.current();
                if matches!(state, PlayerState::Ready | PlayerState::Paused) {
                    self.state.transition(PlayerState::Playing);
                    let clock = self.clock_now();
                    let mut time = self.time.lock();
                    if !time.is_anchored() {
                        time.set_anchor(clock);
                    }
                    drop(time);
                    self.emit(PlayerEvent::Play);
                }
            }
            BackendEvent::Playing => {
                if self.state.current() == PlayerState::Buffering {
                    self.state.transition(PlayerState::Playing);
                }
                let clock = self.clock_now();
                let mut time = self.time.lock();
                if self.state.current() == PlayerState::Playing && !time.is_anchored() {
                    time.set_anchor(clock);
                }
                drop(time);
                self.emit(PlayerEvent::Playing);
            }
            BackendEvent::Pause => {
                // Only spontaneous pauses move the state machine here.
                if self.state.current().is_active() {
                    let clock = self.clock_now();
                    self.time.lock().pause_at(clock);
                    self.state.transition(PlayerState::Paused);
                    self.emit(PlayerEvent::Pause);
                }
            }
            BackendEvent::Ended => {
                let duration = self.time.lock().duration();
                self.time.lock().seek(duration);
                self.transition_to_ready();
                self.emit(PlayerEvent::Ended);
            }
            BackendEvent::TimeUpdate(backend_position) => {
                let clock = self.clock_now();
                let position = {
                    let mut time = self.time.lock();
                    if backend_kind == BackendKind::MediaElement {
                        // Absorb element drift; the controller stays the
                        // single source of truth for reads.
                        time.resync(backend_position, clock);
                    }
                    time.compute(clock)
                };
                self.emit(PlayerEvent::TimeUpdate { position });
            }
            BackendEvent::DurationChange(duration) => {
                self.time.lock().set_duration(duration);
                self.emit(PlayerEvent::DurationChange { duration });
            }
            BackendEvent::Waiting => {
                if self.state.current() == PlayerState::Playing {
                    self.state.transition(PlayerState::Buffering);
                }
                self.emit(PlayerEvent::Waiting);
            }
            BackendEvent::Progress => {
                self.emit(PlayerEvent::Progress);
            }
            BackendEvent::Error(err) => {
                if err.is_abort() {
                    return;
                }
                warn!("backend fault: {err}");
                self.state.transition(PlayerState::Error);
                self.emit_error(&err);
            }
        }
    }

    /// Watch the adaptive engine for mid-playback faults and variant
    /// switches.
    fn spawn_engine_watch(
        self: &Arc<Self>,
        events: Option<tokio::sync::broadcast::Receiver<AdaptiveEvent>>,
    ) -> Option<JoinHandle<()>> {
        let mut events = events?;
        let weak: Weak<PlayerInner> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                match event {
                    AdaptiveEvent::VariantSwitched { index } => {
                        inner.emit(PlayerEvent::QualityChange { index });
                    }
                    AdaptiveEvent::Error {
                        fatal,
                        kind,
                        message,
                    } => {
                        let err = PlayerError::Stream {
                            kind,
                            fatal,
                            message,
                        };
                        if fatal {
                            inner.handle_backend_event(
                                BackendKind::MediaElement,
                                BackendEvent::Error(err),
                            );
                        } else {
                            inner
                                .log
                                .warn("player", format!("non-fatal stream fault: {err}"));
                            inner.emit_error(&err);
                        }
                    }
                    AdaptiveEvent::ManifestParsed { .. } | AdaptiveEvent::MediaAttached => {}
                }
            }
        }))
    }
}

impl Drop for PlayerInner {
    fn drop(&mut self) {
        // Last-resort cleanup for players dropped without dispose().
        self.token.lock().cancel();
        self.cleanup_session();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state())
            .field("mode", &self.mode())
            .finish()
    }
}
