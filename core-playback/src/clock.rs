//! Clock-anchored playback position model.
//!
//! The [`TimeController`] never owns a timer. Position is reconstructed on
//! demand as a pure function of the external render clock and the stored
//! `(base, anchor, rate, loop, duration)` tuple, which keeps the model free
//! of drift accumulation and trivially testable with synthetic clock
//! values.
//!
//! While paused the anchor is absent and `compute` returns the frozen base.
//! While advancing, `position = base + (clock - anchor) * rate`, wrapped by
//! modulo when looping, clamped to `[0, duration]` otherwise.

use crate::error::{PlayerError, Result};
use crate::types::PlaybackRate;

/// Pure-computation position model keyed by an external monotonic clock.
#[derive(Debug, Clone)]
pub struct TimeController {
    /// Position snapshot the current segment started from, in seconds.
    base_position: f64,
    /// Render-clock timestamp at which the segment began advancing.
    /// `None` while paused.
    anchor_clock: Option<f64>,
    rate: f64,
    looping: bool,
    duration: f64,
}

impl TimeController {
    pub fn new() -> Self {
        Self {
            base_position: 0.0,
            anchor_clock: None,
            rate: 1.0,
            looping: false,
            duration: 0.0,
        }
    }

    /// Begin tracking from `position`, paused (no anchor).
    pub fn on_start(&mut self, position: f64) {
        self.base_position = position.max(0.0);
        self.anchor_clock = None;
    }

    /// Mark the clock time at which playback resumed advancing.
    pub fn set_anchor(&mut self, clock: f64) {
        self.anchor_clock = Some(clock);
    }

    /// Whether the position is currently advancing.
    pub fn is_anchored(&self) -> bool {
        self.anchor_clock.is_some()
    }

    /// Freeze the current position as the new base and clear the anchor.
    /// Returns the frozen position.
    pub fn pause_at(&mut self, clock: f64) -> f64 {
        let position = self.compute(clock);
        self.base_position = position;
        self.anchor_clock = None;
        position
    }

    /// Change the playback rate.
    ///
    /// While anchored, the current position is first re-based at `clock` so
    /// the position function stays continuous across the change.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for negative or non-finite rates; state
    /// is unchanged in that case.
    pub fn set_rate(&mut self, clock: f64, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "playback rate must be finite and non-negative, got {rate}"
            )));
        }
        if self.anchor_clock.is_some() {
            self.base_position = self.compute(clock);
            self.anchor_clock = Some(clock);
        }
        self.rate = rate;
        Ok(())
    }

    /// Typed variant of [`set_rate`](Self::set_rate).
    pub fn set_playback_rate(&mut self, clock: f64, rate: PlaybackRate) {
        // PlaybackRate is validated at construction; this cannot fail.
        let _ = self.set_rate(clock, f64::from(rate.value()));
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Current position for the given clock value.
    pub fn compute(&self, clock: f64) -> f64 {
        let raw = match self.anchor_clock {
            None => self.base_position,
            Some(anchor) => self.base_position + (clock - anchor) * self.rate,
        };
        if self.looping && self.duration > 0.0 {
            raw.rem_euclid(self.duration)
        } else if self.duration > 0.0 {
            raw.clamp(0.0, self.duration)
        } else {
            raw.max(0.0)
        }
    }

    /// Snapshot the position at `seconds` (clamped to `[0, duration]`) and
    /// clear the anchor. Resuming is a separate, explicit action.
    /// Returns the clamped position.
    pub fn seek(&mut self, seconds: f64) -> f64 {
        let clamped = if self.duration > 0.0 {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        };
        self.base_position = clamped;
        self.anchor_clock = None;
        clamped
    }

    /// Re-base at a backend-reported position without touching the
    /// advancing/paused status. Used to absorb media-element drift.
    pub fn resync(&mut self, position: f64, clock: f64) {
        self.base_position = position.max(0.0);
        if self.anchor_clock.is_some() {
            self.anchor_clock = Some(clock);
        }
    }
}

impl Default for TimeController {
    fn default() -> Self {
        Self::new()
    }
}
