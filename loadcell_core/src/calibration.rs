//! Calibration parameters and the raw → weight conversion.
//!
//! weight = (raw - zero_offset) / reference_unit
//!
//! `reference_unit` is raw counts per unit of weight (grams in practice). It is
//! never divided by when zero or non-finite; such parameters are "uncalibrated".

use loadcell_traits::Channel;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    /// Raw reading at zero load.
    pub zero_offset: i64,
    /// Raw counts per unit of weight.
    pub reference_unit: f64,
    pub channel: Channel,
}

impl CalibrationParameters {
    /// First-boot parameters: no offset, one count per unit.
    pub fn defaults(channel: Channel) -> Self {
        Self {
            zero_offset: 0,
            reference_unit: 1.0,
            channel,
        }
    }

    /// True when conversion can divide by `reference_unit`.
    pub fn is_calibrated(&self) -> bool {
        self.reference_unit != 0.0 && self.reference_unit.is_finite()
    }

    /// Raw sample with the zero offset removed.
    #[inline]
    pub fn offset_compensated(&self, raw: i32) -> i64 {
        i64::from(raw) - self.zero_offset
    }

    pub fn to_weight(&self, raw: i32) -> Result<f64, ConvertError> {
        convert(raw, self)
    }
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self::defaults(Channel::A)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConvertError {
    #[error("reference unit {reference_unit} cannot be divided by")]
    Uncalibrated { reference_unit: f64 },
    #[error("sample from channel {got} does not match calibrated channel {expected}")]
    ChannelMismatch { expected: Channel, got: Channel },
}

/// Convert one raw sample to weight. Pure; guards the division.
#[inline]
pub fn convert(raw: i32, params: &CalibrationParameters) -> Result<f64, ConvertError> {
    if !params.is_calibrated() {
        return Err(ConvertError::Uncalibrated {
            reference_unit: params.reference_unit,
        });
    }
    Ok(params.offset_compensated(raw) as f64 / params.reference_unit)
}

/// Calibration shared between the facade, the calibration engine and the
/// delivery thread. Readers always see a whole parameter set.
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    inner: Arc<RwLock<CalibrationParameters>>,
}

impl SharedCalibration {
    pub fn new(params: CalibrationParameters) -> Self {
        Self {
            inner: Arc::new(RwLock::new(params)),
        }
    }

    /// Copy of the current parameters. A poisoned lock still holds a whole
    /// `Copy` value, so it is read through.
    pub fn get(&self) -> CalibrationParameters {
        match self.inner.read() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Apply `f` under the write lock and return the resulting parameters.
    pub fn update(&self, f: impl FnOnce(&mut CalibrationParameters)) -> CalibrationParameters {
        let mut g = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut g);
        *g
    }
}
