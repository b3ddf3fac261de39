//! Tare and known-weight calibration.
//!
//! Both operations poll the source directly, skip ticks that produce no sample,
//! and average what they collect within the attempt budget. They block the
//! calling thread for at most `max_attempts` reads (plus settling delays for
//! calibrate). Calls are serialized by an internal lock.

use loadcell_traits::LoadCell;
use loadcell_traits::clock::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::calibration::{CalibrationParameters, SharedCalibration};
use crate::config::{CalibrationCfg, Timeouts};
use crate::error::{Result, ScaleError};
use crate::hw_error::trace_read_failure;

pub struct CalibrationEngine {
    cfg: CalibrationCfg,
    timeouts: Timeouts,
    clock: Arc<dyn Clock + Send + Sync>,
    busy: Mutex<()>,
}

impl core::fmt::Debug for CalibrationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CalibrationEngine")
            .field("cfg", &self.cfg)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Mean of the values collected by one sampling run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averaged {
    pub mean: f64,
    pub collected: u32,
    pub attempts: u32,
}

impl CalibrationEngine {
    pub fn new(cfg: CalibrationCfg, timeouts: Timeouts, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            cfg,
            timeouts,
            clock,
            busy: Mutex::new(()),
        }
    }

    /// Set the zero offset to the mean raw reading of the unloaded scale.
    ///
    /// The scale must be empty; this cannot be checked here.
    pub fn tare<S: LoadCell + ?Sized>(
        &self,
        source: &Mutex<S>,
        calibration: &SharedCalibration,
    ) -> Result<CalibrationParameters> {
        self.tare_then(source, calibration, |_| ()).map(|(p, ())| p)
    }

    /// [`tare`](Self::tare), then `commit` the new parameters before another
    /// calibration call can start.
    pub fn tare_then<S: LoadCell + ?Sized, R>(
        &self,
        source: &Mutex<S>,
        calibration: &SharedCalibration,
        commit: impl FnOnce(&CalibrationParameters) -> R,
    ) -> Result<(CalibrationParameters, R)> {
        let _busy = self.serialize();
        let avg = self.average(source, self.cfg.tare_samples, Duration::ZERO, i64::from)?;
        let zero_offset = avg.mean.round() as i64;
        let params = calibration.update(|p| p.zero_offset = zero_offset);
        tracing::info!(
            zero_offset,
            collected = avg.collected,
            attempts = avg.attempts,
            "tare complete"
        );
        let committed = commit(&params);
        Ok((params, committed))
    }

    /// Derive the reference unit from `known_weight` currently on the scale.
    ///
    /// Samples are offset-compensated with the zero offset in effect when the
    /// call starts, so a preceding tare is part of the result.
    pub fn calibrate<S: LoadCell + ?Sized>(
        &self,
        source: &Mutex<S>,
        calibration: &SharedCalibration,
        known_weight: f64,
    ) -> Result<CalibrationParameters> {
        self.calibrate_then(source, calibration, known_weight, |_| ())
            .map(|(p, ())| p)
    }

    /// [`calibrate`](Self::calibrate), then `commit` the new parameters before
    /// another calibration call can start.
    pub fn calibrate_then<S: LoadCell + ?Sized, R>(
        &self,
        source: &Mutex<S>,
        calibration: &SharedCalibration,
        known_weight: f64,
        commit: impl FnOnce(&CalibrationParameters) -> R,
    ) -> Result<(CalibrationParameters, R)> {
        check_known_weight(known_weight)?;
        let _busy = self.serialize();
        let current = calibration.get();
        let settle = Duration::from_millis(self.cfg.settle_ms);
        let avg = self.average(source, self.cfg.samples, settle, |raw| {
            current.offset_compensated(raw)
        })?;

        let reference_unit = avg.mean / known_weight;
        if reference_unit == 0.0 || !reference_unit.is_finite() {
            return Err(ScaleError::Uncalibrated(format!(
                "reference unit {reference_unit} from mean {} (is the weight on the scale?)",
                avg.mean
            ))
            .into());
        }
        let params = calibration.update(|p| p.reference_unit = reference_unit);
        tracing::info!(
            known_weight,
            reference_unit,
            average_offset_value = avg.mean,
            collected = avg.collected,
            attempts = avg.attempts,
            "calibration complete"
        );
        let committed = commit(&params);
        Ok((params, committed))
    }

    fn serialize(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.busy.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Collect up to `wanted` mapped samples within the attempt budget and
    /// average them. Sleeps `settle` after every attempt but the last.
    fn average<S: LoadCell + ?Sized>(
        &self,
        source: &Mutex<S>,
        wanted: u32,
        settle: Duration,
        map: impl Fn(i32) -> i64,
    ) -> Result<Averaged> {
        let timeout = self.timeouts.sensor();
        let mut sum: i128 = 0;
        let mut collected: u32 = 0;
        let mut attempts: u32 = 0;

        while collected < wanted && attempts < self.cfg.max_attempts {
            attempts += 1;
            let read = {
                let mut cell = source
                    .lock()
                    .map_err(|_| ScaleError::State("sampling source lock poisoned".into()))?;
                cell.read(timeout)
            };
            match read {
                Ok(raw) => {
                    sum += i128::from(map(raw));
                    collected += 1;
                    tracing::trace!(raw, collected, "calibration sample");
                }
                Err(e) => trace_read_failure(e.as_ref(), "calibration"),
            }
            if collected < wanted && !settle.is_zero() {
                self.clock.sleep(settle);
            }
        }

        if collected == 0 {
            tracing::warn!(attempts, "no samples collected");
            return Err(ScaleError::SensorTimeout { attempts }.into());
        }
        if collected < wanted {
            tracing::warn!(collected, wanted, attempts, "averaging fewer samples than requested");
        }
        Ok(Averaged {
            mean: sum as f64 / f64::from(collected),
            collected,
            attempts,
        })
    }
}

/// A calibration weight must be a positive finite number of grams.
pub fn check_known_weight(known_weight: f64) -> Result<()> {
    if known_weight.is_finite() && known_weight > 0.0 {
        Ok(())
    } else {
        Err(ScaleError::InvalidArgument(format!(
            "known weight must be a positive number, got {known_weight}"
        ))
        .into())
    }
}
