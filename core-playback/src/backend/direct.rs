//! Direct-buffer backend: renders decoded PCM through device sources.
//!
//! Render sources are single-use; every `play`/`seek` while playing
//! constructs a fresh source bound to the decoded buffer and starts it at
//! the tracked offset. The backend keeps its own offset/anchor pair
//! (mirroring the orchestrator's time model) because it must answer
//! `current_time` and detect natural end without a device-wide callback.
//! The orchestrator's controller stays authoritative for everything the
//! caller sees.
//!
//! While playing, a ~60 Hz scheduled task reads the position and emits
//! `timeupdate`; it only ever *reads* the mirror, and it is cancelled on
//! pause/stop/dispose.

use crate::backend::{BackendEvent, BackendEventSender};
use crate::error::{PlayerError, Result};
use crate::types::{PlaybackRate, Volume};
use bridge_traits::audio::PcmBuffer;
use bridge_traits::render::{RenderDevice, SourceStartOptions, StageId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const TICK_INTERVAL: Duration = Duration::from_millis(16);

pub struct DirectBufferBackend {
    inner: Arc<Inner>,
}

struct Inner {
    device: Arc<dyn RenderDevice>,
    buffer: Arc<PcmBuffer>,
    output: StageId,
    duration: f64,
    events: BackendEventSender,
    source: Mutex<Option<bridge_traits::render::SourceId>>,
    /// Backend-local position mirror: frozen offset plus optional clock
    /// anchor while advancing.
    offset: Mutex<f64>,
    anchor: Mutex<Option<f64>>,
    rate: Mutex<f32>,
    looping: AtomicBool,
    volume: Mutex<f32>,
    muted: AtomicBool,
    ticker: Mutex<Option<JoinHandle<()>>>,
    playing: AtomicBool,
    disposed: AtomicBool,
}

impl DirectBufferBackend {
    /// Build the backend around a decoded buffer: creates the output gain
    /// stage, applies the initial transport values and reports duration.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        buffer: Arc<PcmBuffer>,
        events: BackendEventSender,
        volume: Volume,
        muted: bool,
        rate: PlaybackRate,
        looping: bool,
    ) -> Result<Self> {
        let output = device
            .create_gain_stage()
            .map_err(PlayerError::from_load_fault)?;
        let duration = buffer.duration_seconds();

        let inner = Arc::new(Inner {
            device,
            buffer,
            output,
            duration,
            events,
            source: Mutex::new(None),
            offset: Mutex::new(0.0),
            anchor: Mutex::new(None),
            rate: Mutex::new(rate.value()),
            looping: AtomicBool::new(looping),
            volume: Mutex::new(volume.value()),
            muted: AtomicBool::new(muted),
            ticker: Mutex::new(None),
            playing: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        });

        inner.apply_gain()?;
        let _ = inner.events.send(BackendEvent::DurationChange(duration));
        Ok(Self { inner })
    }

    pub fn is_ready(&self) -> bool {
        !self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    pub fn duration(&self) -> f64 {
        self.inner.duration
    }

    pub fn output_stage(&self) -> StageId {
        self.inner.output
    }

    pub async fn play(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.disposed.load(Ordering::SeqCst) {
            return Err(PlayerError::PlaybackFailed("backend disposed".to_string()));
        }
        if inner.playing.load(Ordering::SeqCst) {
            return Ok(());
        }

        let offset = *inner.offset.lock();
        inner.start_source_at(offset)?;

        *inner.anchor.lock() = Some(inner.device.clock_seconds());
        inner.playing.store(true, Ordering::SeqCst);
        self.spawn_ticker();
        let _ = inner.events.send(BackendEvent::Playing);
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        let inner = &self.inner;
        if !inner.playing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let position = inner.position();
        inner.teardown_source();
        *inner.offset.lock() = position;
        *inner.anchor.lock() = None;
        inner.stop_ticker();
        let _ = inner.events.send(BackendEvent::Pause);
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        inner.playing.store(false, Ordering::SeqCst);
        inner.teardown_source();
        *inner.offset.lock() = 0.0;
        *inner.anchor.lock() = None;
        inner.stop_ticker();
        Ok(())
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        let inner = &self.inner;
        let clamped = seconds.clamp(0.0, inner.duration);
        if inner.playing.load(Ordering::SeqCst) {
            // Sources are single-use: restart at the new offset.
            inner.teardown_source();
            inner.start_source_at(clamped)?;
            *inner.offset.lock() = clamped;
            *inner.anchor.lock() = Some(inner.device.clock_seconds());
        } else {
            *inner.offset.lock() = clamped;
        }
        Ok(())
    }

    pub fn current_time(&self) -> f64 {
        self.inner.position()
    }

    pub fn set_volume(&self, volume: Volume) {
        *self.inner.volume.lock() = volume.value();
        let _ = self.inner.apply_gain();
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.muted.store(muted, Ordering::SeqCst);
        let _ = self.inner.apply_gain();
    }

    pub fn set_rate(&self, rate: PlaybackRate) {
        let inner = &self.inner;
        if inner.playing.load(Ordering::SeqCst) {
            // Re-anchor so the mirror stays continuous across the change.
            let position = inner.position();
            *inner.offset.lock() = position;
            *inner.anchor.lock() = Some(inner.device.clock_seconds());
        }
        *inner.rate.lock() = rate.value();
        if let Some(source) = *inner.source.lock() {
            let _ = inner.device.set_source_rate(source, rate.value());
        }
    }

    pub fn set_loop(&self, looping: bool) {
        self.inner.looping.store(looping, Ordering::SeqCst);
        if let Some(source) = *self.inner.source.lock() {
            let _ = self.inner.device.set_source_looping(source, looping);
        }
    }

    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.playing.store(false, Ordering::SeqCst);
        inner.teardown_source();
        inner.stop_ticker();
        let _ = inner.device.disconnect(inner.output);
        let _ = inner.device.release_stage(inner.output);
        debug!("direct-buffer backend disposed");
    }

    /// Periodic render tick: read the position mirror, emit `timeupdate`,
    /// detect natural end.
    fn spawn_ticker(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.playing.load(Ordering::SeqCst) {
                    break;
                }
                let position = inner.position();
                let _ = inner.events.send(BackendEvent::TimeUpdate(position));

                let ended = !inner.looping.load(Ordering::SeqCst)
                    && inner.duration > 0.0
                    && position >= inner.duration;
                if ended {
                    inner.playing.store(false, Ordering::SeqCst);
                    inner.teardown_source();
                    *inner.offset.lock() = inner.duration;
                    *inner.anchor.lock() = None;
                    let _ = inner.events.send(BackendEvent::Ended);
                    break;
                }
            }
        });
        if let Some(previous) = self.inner.ticker.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Inner {
    fn position(&self) -> f64 {
        let offset = *self.offset.lock();
        let raw = match *self.anchor.lock() {
            None => offset,
            Some(anchor) => {
                offset + (self.device.clock_seconds() - anchor) * f64::from(*self.rate.lock())
            }
        };
        if self.looping.load(Ordering::SeqCst) && self.duration > 0.0 {
            raw.rem_euclid(self.duration)
        } else if self.duration > 0.0 {
            raw.clamp(0.0, self.duration)
        } else {
            raw.max(0.0)
        }
    }

    fn start_source_at(&self, offset: f64) -> Result<()> {
        let source = self
            .device
            .create_source(&self.buffer)
            .map_err(PlayerError::from_playback_fault)?;
        let started = self
            .device
            .connect_source(source, self.output)
            .and_then(|_| {
                self.device.start_source(
                    source,
                    SourceStartOptions {
                        offset_seconds: offset,
                        rate: *self.rate.lock(),
                        looping: self.looping.load(Ordering::SeqCst),
                    },
                )
            });
        if let Err(err) = started {
            let _ = self.device.release_source(source);
            return Err(PlayerError::from_playback_fault(err));
        }
        *self.source.lock() = Some(source);
        Ok(())
    }

    fn teardown_source(&self) {
        if let Some(source) = self.source.lock().take() {
            let _ = self.device.stop_source(source);
            let _ = self.device.release_source(source);
        }
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }

    fn apply_gain(&self) -> Result<()> {
        let effective = if self.muted.load(Ordering::SeqCst) {
            0.0
        } else {
            *self.volume.lock()
        };
        self.device
            .set_stage_gain(self.output, effective)
            .map_err(PlayerError::from_playback_fault)
    }
}

impl Drop for DirectBufferBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for DirectBufferBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectBufferBackend")
            .field("duration", &self.inner.duration)
            .field("playing", &self.is_playing())
            .finish()
    }
}
