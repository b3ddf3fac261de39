//! `From` implementations bridging `loadcell_config` types to `loadcell_core` types.

use crate::calibration::CalibrationParameters;
use crate::config::{CalibrationCfg, SamplingMode, Timeouts};
use loadcell_config::PersistedCalibration;
use loadcell_traits::Channel;

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&loadcell_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &loadcell_config::CalibrationCfg) -> Self {
        Self {
            tare_samples: c.tare_samples,
            samples: c.samples,
            settle_ms: c.settle_ms,
            max_attempts: c.max_attempts,
        }
    }
}

// ── SamplingMode ─────────────────────────────────────────────────────────────

impl From<&loadcell_config::Sampling> for SamplingMode {
    fn from(c: &loadcell_config::Sampling) -> Self {
        match c.mode {
            loadcell_config::SamplingMode::Event => SamplingMode::Event,
            loadcell_config::SamplingMode::Paced => SamplingMode::Paced(c.sample_rate_hz),
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&loadcell_config::Hardware> for Timeouts {
    fn from(c: &loadcell_config::Hardware) -> Self {
        Self {
            sensor_ms: c.sensor_read_timeout_ms,
        }
    }
}

// ── Calibration record ───────────────────────────────────────────────────────

impl CalibrationParameters {
    pub fn from_persisted(p: &PersistedCalibration, channel: Channel) -> Self {
        Self {
            zero_offset: p.offset,
            reference_unit: p.reference_unit,
            channel,
        }
    }
}

impl From<&CalibrationParameters> for PersistedCalibration {
    fn from(p: &CalibrationParameters) -> Self {
        Self {
            offset: p.zero_offset,
            reference_unit: p.reference_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_paced_sampling_rate() {
        let cfg = loadcell_config::load_toml("[sampling]\nmode = \"paced\"\nsample_rate_hz = 80\n")
            .unwrap();
        assert_eq!(SamplingMode::from(&cfg.sampling), SamplingMode::Paced(80));
        let cfg = loadcell_config::load_toml("").unwrap();
        assert_eq!(SamplingMode::from(&cfg.sampling), SamplingMode::Event);
    }

    #[test]
    fn maps_calibration_budget_and_timeouts() {
        let cfg = loadcell_config::load_toml(
            "[calibration]\nsamples = 5\nsettle_ms = 10\n[hardware]\nsensor_read_timeout_ms = 90\n",
        )
        .unwrap();
        let cal = CalibrationCfg::from(&cfg.calibration);
        assert_eq!(cal.samples, 5);
        assert_eq!(cal.settle_ms, 10);
        assert_eq!(Timeouts::from(&cfg.hardware).sensor_ms, 90);
    }

    #[test]
    fn persisted_record_carries_both_scalars() {
        let params = CalibrationParameters {
            zero_offset: -77,
            reference_unit: 3.25,
            channel: Channel::B,
        };
        let rec = PersistedCalibration::from(&params);
        assert_eq!(CalibrationParameters::from_persisted(&rec, Channel::B), params);
    }
}
