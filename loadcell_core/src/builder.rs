//! Type-state builder for `LoadCellScale`.
//!
//! The builder enforces at compile time that a sampling source is provided
//! before `build()` is available. Everything else has a default.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use loadcell_traits::LoadCell;
use loadcell_traits::clock::{Clock, MonotonicClock};

use crate::calibration::SharedCalibration;
use crate::config::{CalibrationCfg, SamplingMode, Timeouts};
use crate::engine::CalibrationEngine;
use crate::error::{BuildError, Result};
use crate::live::LiveReader;
use crate::scale::{AutoTare, LoadCellScale, Startup};
use crate::store::{CalibrationStore, LoadOutcome, MemoryStore};

// ── Type-state marker ────────────────────────────────────────────────────────

pub struct Missing;

/// Builder for `LoadCellScale`. All fields are validated on `build()`.
pub struct ScaleBuilder<S> {
    source: Option<S>,
    store: Option<Arc<dyn CalibrationStore + Send + Sync>>,
    calibration: Option<CalibrationCfg>,
    sampling: Option<SamplingMode>,
    timeouts: Option<Timeouts>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    auto_tare: bool,
    _s: PhantomData<S>,
}

impl Default for ScaleBuilder<Missing> {
    fn default() -> Self {
        Self {
            source: None,
            store: None,
            calibration: None,
            sampling: None,
            timeouts: None,
            clock: None,
            auto_tare: true,
            _s: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<S> ScaleBuilder<S> {
    /// Where calibration is loaded from and saved to. Defaults to an empty
    /// [`MemoryStore`], i.e. nothing survives the process.
    pub fn with_store(mut self, store: impl CalibrationStore + Send + Sync + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }
    pub fn with_shared_store(mut self, store: Arc<dyn CalibrationStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }
    pub fn with_calibration_cfg(mut self, cfg: CalibrationCfg) -> Self {
        self.calibration = Some(cfg);
        self
    }
    pub fn with_sampling(mut self, mode: SamplingMode) -> Self {
        self.sampling = Some(mode);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Tare once after loading calibration. On by default.
    pub fn auto_tare(mut self, enabled: bool) -> Self {
        self.auto_tare = enabled;
        self
    }
    /// Apply the sampling, timeout and calibration sections of an application config.
    pub fn with_config(self, cfg: &loadcell_config::Config) -> Self {
        self.with_calibration_cfg((&cfg.calibration).into())
            .with_sampling((&cfg.sampling).into())
            .with_timeouts((&cfg.hardware).into())
            .auto_tare(cfg.calibration.auto_tare)
    }
}

// Setter that advances type-state
impl ScaleBuilder<Missing> {
    pub fn with_source<S>(self, source: S) -> ScaleBuilder<S>
    where
        S: LoadCell + Send + 'static,
    {
        ScaleBuilder {
            source: Some(source),
            store: self.store,
            calibration: self.calibration,
            sampling: self.sampling,
            timeouts: self.timeouts,
            clock: self.clock,
            auto_tare: self.auto_tare,
            _s: PhantomData,
        }
    }
}

impl<S: LoadCell + Send + 'static> ScaleBuilder<S> {
    /// Validate, load stored calibration, and optionally tare.
    ///
    /// A missing or unreadable calibration and a failed auto-tare are logged
    /// and reported in [`LoadCellScale::startup`], never returned as errors.
    pub fn build(self) -> Result<LoadCellScale<S>> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::InvalidConfig("sampling source missing")))?;
        let cfg = self.calibration.unwrap_or_default();
        let mode = self.sampling.unwrap_or_default();
        let timeouts = self.timeouts.unwrap_or_default();

        // ── Validation ───────────────────────────────────────────────────────
        cfg.check()
            .map_err(|m| eyre::Report::new(BuildError::InvalidConfig(m)))?;
        if timeouts.sensor_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sensor_ms must be >= 1",
            )));
        }
        if let SamplingMode::Paced(0) = mode {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sample_rate_hz must be > 0",
            )));
        }

        let store = match self.store {
            Some(s) => s,
            None => {
                tracing::info!("no calibration store configured; calibration will not persist");
                Arc::new(MemoryStore::new())
            }
        };
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        // ── Load ─────────────────────────────────────────────────────────────
        let channel = source.channel();
        let outcome = store.load(channel);
        let defaulted_reason = match &outcome {
            LoadOutcome::Loaded(p) => {
                tracing::info!(
                    store = %store.describe(),
                    zero_offset = p.zero_offset,
                    reference_unit = p.reference_unit,
                    "calibration loaded"
                );
                None
            }
            LoadOutcome::Defaulted { reason, .. } => {
                tracing::warn!(
                    store = %store.describe(),
                    %reason,
                    "using default calibration"
                );
                Some(reason.to_string())
            }
        };

        let source = Arc::new(Mutex::new(source));
        let calibration = SharedCalibration::new(outcome.params());
        let engine = CalibrationEngine::new(cfg, timeouts.clone(), clock.clone());
        let live = LiveReader::new(source.clone(), calibration.clone(), mode, timeouts, clock);

        let mut scale = LoadCellScale {
            source,
            channel,
            calibration,
            engine,
            live,
            store,
            startup: Startup {
                loaded: outcome.is_loaded(),
                defaulted_reason,
                auto_tare: AutoTare::Skipped,
            },
        };

        if self.auto_tare {
            scale.startup.auto_tare = match scale.tare() {
                Ok(outcome) => AutoTare::Done {
                    saved: outcome.is_saved(),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "auto-tare failed; keeping loaded offset");
                    AutoTare::Failed(e.to_string())
                }
            };
        }
        Ok(scale)
    }
}
