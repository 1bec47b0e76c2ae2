//! Post-render signal chain: gain staging plus a parametric filter bank.
//!
//! Topology: `input gain -> band 0 -> ... -> band N-1 -> output gain ->
//! device output`, or `input gain -> output gain -> device output` while
//! bypassed. Rebuilding the topology fully disconnects and re-links every
//! stage; a partially relinked graph would double-render through stale
//! connections.
//!
//! The chain is process-lifetime: it is built once against the render
//! device and reused across loads, with backend outputs attached to its
//! input stage.

use crate::error::{PlayerError, Result};
use bridge_traits::render::{FilterParams, FilterShape, RenderDevice, StageId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// ISO octave-band center frequencies used for the default 10-band bank.
pub const DEFAULT_BAND_FREQUENCIES: [f32; 10] = [
    31.5, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

const BAND_Q: f32 = 1.0;

struct Band {
    stage: StageId,
    params: FilterParams,
}

/// Gain + filter-bank chain built on top of a render device.
pub struct SignalChain {
    device: Arc<dyn RenderDevice>,
    input: StageId,
    output: StageId,
    bands: Mutex<Vec<Band>>,
    bypass: AtomicBool,
    volume: Mutex<f32>,
    disposed: AtomicBool,
}

impl SignalChain {
    /// Build the default 10-band chain and link it to the device output.
    pub fn new(device: Arc<dyn RenderDevice>) -> Result<Self> {
        Self::with_frequencies(device, &DEFAULT_BAND_FREQUENCIES)
    }

    /// Build a chain with custom band frequencies.
    ///
    /// The first band is a low shelf, the last a high shelf, everything in
    /// between a peaking filter.
    pub fn with_frequencies(device: Arc<dyn RenderDevice>, frequencies: &[f32]) -> Result<Self> {
        let input = device
            .create_gain_stage()
            .map_err(PlayerError::from_load_fault)?;
        let output = device
            .create_gain_stage()
            .map_err(PlayerError::from_load_fault)?;

        let mut bands = Vec::with_capacity(frequencies.len());
        for (index, &frequency) in frequencies.iter().enumerate() {
            let shape = if index == 0 {
                FilterShape::LowShelf
            } else if index + 1 == frequencies.len() {
                FilterShape::HighShelf
            } else {
                FilterShape::Peaking
            };
            let params = FilterParams {
                frequency,
                gain_db: 0.0,
                q: BAND_Q,
                shape,
            };
            let stage = device
                .create_filter_stage(params)
                .map_err(PlayerError::from_load_fault)?;
            bands.push(Band { stage, params });
        }

        let chain = Self {
            device,
            input,
            output,
            bands: Mutex::new(bands),
            bypass: AtomicBool::new(false),
            volume: Mutex::new(1.0),
            disposed: AtomicBool::new(false),
        };
        chain.relink()?;
        Ok(chain)
    }

    /// Stage a backend output should connect into.
    pub fn input_stage(&self) -> StageId {
        self.input
    }

    /// Number of filter bands.
    pub fn band_count(&self) -> usize {
        self.bands.lock().len()
    }

    /// Set the gain of one band in decibels. Out-of-range indices are a
    /// no-op, not an error.
    pub fn set_band(&self, index: usize, gain_db: f32) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let mut bands = self.bands.lock();
        let Some(band) = bands.get_mut(index) else {
            return Ok(());
        };
        band.params.gain_db = gain_db;
        self.device
            .update_filter_stage(band.stage, band.params)
            .map_err(PlayerError::from_load_fault)
    }

    /// Current per-band gains in decibels, in bank order.
    pub fn band_gains(&self) -> Vec<f32> {
        self.bands.lock().iter().map(|b| b.params.gain_db).collect()
    }

    /// Whether the bank is currently bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.bypass.load(Ordering::SeqCst)
    }

    /// Enable or disable bypass, rebuilding the topology when it changes.
    pub fn set_bypass(&self, bypass: bool) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.bypass.swap(bypass, Ordering::SeqCst) == bypass {
            return Ok(());
        }
        self.relink()
    }

    /// Output gain in `[0.0, 1.0]`; out-of-range input is clamped.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        let clamped = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        *self.volume.lock() = clamped;
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.device
            .set_stage_gain(self.output, clamped)
            .map_err(PlayerError::from_load_fault)
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    /// Tear down every connection and re-link the whole chain for the
    /// current bypass flag.
    fn relink(&self) -> Result<()> {
        let bands = self.bands.lock();

        self.device
            .disconnect(self.input)
            .map_err(PlayerError::from_load_fault)?;
        for band in bands.iter() {
            self.device
                .disconnect(band.stage)
                .map_err(PlayerError::from_load_fault)?;
        }
        self.device
            .disconnect(self.output)
            .map_err(PlayerError::from_load_fault)?;

        if self.bypass.load(Ordering::SeqCst) || bands.is_empty() {
            self.device
                .connect(self.input, self.output)
                .map_err(PlayerError::from_load_fault)?;
        } else {
            self.device
                .connect(self.input, bands[0].stage)
                .map_err(PlayerError::from_load_fault)?;
            for pair in bands.windows(2) {
                self.device
                    .connect(pair[0].stage, pair[1].stage)
                    .map_err(PlayerError::from_load_fault)?;
            }
            self.device
                .connect(bands[bands.len() - 1].stage, self.output)
                .map_err(PlayerError::from_load_fault)?;
        }

        self.device
            .connect_to_output(self.output)
            .map_err(PlayerError::from_load_fault)
    }

    /// Release every stage. Further mutations become no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let bands = self.bands.lock();
        let _ = self.device.disconnect(self.input);
        let _ = self.device.release_stage(self.input);
        for band in bands.iter() {
            let _ = self.device.disconnect(band.stage);
            let _ = self.device.release_stage(band.stage);
        }
        let _ = self.device.disconnect(self.output);
        let _ = self.device.release_stage(self.output);
    }
}

impl std::fmt::Debug for SignalChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalChain")
            .field("bands", &self.band_count())
            .field("bypass", &self.is_bypassed())
            .field("volume", &self.volume())
            .finish()
    }
}
