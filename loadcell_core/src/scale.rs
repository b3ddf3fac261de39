//! The public scale: calibration store, calibration engine and live reading
//! controller behind one handle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use loadcell_traits::{Channel, LoadCell};

use crate::builder::{Missing, ScaleBuilder};
use crate::calibration::{CalibrationParameters, SharedCalibration};
use crate::engine::{CalibrationEngine, check_known_weight};
use crate::error::Result;
use crate::live::LiveReader;
use crate::status::LiveStats;
use crate::store::{CalibrationStore, SaveOutcome};

/// What happened to the auto-tare at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoTare {
    Skipped,
    Done { saved: bool },
    Failed(String),
}

/// How the scale came up: stored calibration or defaults, and the auto-tare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Startup {
    pub loaded: bool,
    /// Why defaults were used, when they were.
    pub defaulted_reason: Option<String>,
    pub auto_tare: AutoTare,
}

pub struct LoadCellScale<S = Box<dyn LoadCell + Send>> {
    pub(crate) source: Arc<Mutex<S>>,
    pub(crate) channel: Channel,
    pub(crate) calibration: SharedCalibration,
    pub(crate) engine: CalibrationEngine,
    pub(crate) live: LiveReader<S>,
    pub(crate) store: Arc<dyn CalibrationStore + Send + Sync>,
    pub(crate) startup: Startup,
}

impl<S> core::fmt::Debug for LoadCellScale<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoadCellScale")
            .field("channel", &self.channel)
            .field("calibration", &self.calibration.get())
            .field("store", &self.store.describe())
            .finish()
    }
}

impl LoadCellScale {
    /// Start building a scale.
    pub fn builder() -> ScaleBuilder<Missing> {
        ScaleBuilder::default()
    }
}

impl<S: LoadCell + Send + 'static> LoadCellScale<S> {
    /// Zero the scale at its current (empty) load and persist the new offset.
    ///
    /// Live reading, if active, is paused for the duration. The save happens
    /// before any other calibration call can start.
    pub fn tare(&self) -> Result<SaveOutcome> {
        let (_, saved) = self.live.paused(|| {
            self.engine
                .tare_then(&*self.source, &self.calibration, |p| self.persist(p))
        })??;
        Ok(saved)
    }

    /// Derive the reference unit from `known_weight` on the scale and persist it.
    ///
    /// Fails with `InvalidArgument` before sampling when `known_weight` is not
    /// a positive finite number. On any failure the previous calibration stays.
    pub fn calibrate(&self, known_weight: f64) -> Result<SaveOutcome> {
        check_known_weight(known_weight)?;
        let (_, saved) = self.live.paused(|| {
            self.engine.calibrate_then(
                &*self.source,
                &self.calibration,
                known_weight,
                |p| self.persist(p),
            )
        })??;
        Ok(saved)
    }

    pub fn start_reading(&self) -> Result<()> {
        self.live.start_reading()
    }

    pub fn stop_reading(&self) {
        self.live.stop_reading();
    }

    /// Most recent weight from live reading; 0.0 before the first one.
    pub fn get_weight(&self) -> f64 {
        self.live.get_weight()
    }

    pub fn is_reading(&self) -> bool {
        self.live.is_reading()
    }

    /// Snapshot of the calibration in effect.
    pub fn calibration(&self) -> CalibrationParameters {
        self.calibration.get()
    }

    pub fn stats(&self) -> LiveStats {
        self.live.stats()
    }

    /// Block until `total` live conversions have been published, or `timeout`.
    pub fn wait_for_conversions(&self, total: u64, timeout: Duration) -> bool {
        self.live.wait_for_conversions(total, timeout)
    }

    pub fn startup(&self) -> &Startup {
        &self.startup
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    fn persist(&self, params: &CalibrationParameters) -> SaveOutcome {
        match self.store.save(self.channel, params) {
            Ok(()) => SaveOutcome::Saved,
            Err(e) => {
                tracing::warn!(
                    store = %self.store.describe(),
                    error = %e,
                    "calibration not saved; it stays active until restart"
                );
                SaveOutcome::Unsaved(e)
            }
        }
    }
}
