#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the load cell scale.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - `PersistedCalibration` is the two-number calibration record written after
//!   every tare/calibrate, stored as a small JSON object keyed by channel.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the persisted calibration record.
pub const DEFAULT_CALIBRATION_FILE: &str = "scale_config.json";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            hx711_dt: 23,
            hx711_sck: 24,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Amplifier gain: 128 or 64 selects channel A, 32 selects channel B.
    pub gain: u8,
    /// Max time to wait for HX711 data-ready (DOUT low) per read.
    pub sensor_read_timeout_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            gain: 128,
            sensor_read_timeout_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Block on the amplifier's own data-ready cadence.
    #[default]
    Event,
    /// Read at a fixed rate (`sample_rate_hz`).
    Paced,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sampling {
    pub mode: SamplingMode,
    /// Only used in paced mode.
    pub sample_rate_hz: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Event,
            sample_rate_hz: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Where tare/calibrate results are persisted.
    pub file: PathBuf,
    /// Raw samples averaged by tare.
    pub tare_samples: u32,
    /// Offset-compensated samples averaged by calibrate.
    pub samples: u32,
    /// Settling delay between calibration samples.
    pub settle_ms: u64,
    /// Read attempts allowed per calibration before giving up.
    pub max_attempts: u32,
    /// Tare once when the scale is constructed.
    pub auto_tare: bool,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_CALIBRATION_FILE),
            tare_samples: 15,
            samples: 20,
            settle_ms: 50,
            max_attempts: 60,
            auto_tare: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub hardware: Hardware,
    pub sampling: Sampling,
    pub calibration: CalibrationCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.hx711_dt == self.pins.hx711_sck {
            eyre::bail!("pins.hx711_dt and pins.hx711_sck must differ");
        }

        // Hardware
        if !matches!(self.hardware.gain, 128 | 64 | 32) {
            eyre::bail!("hardware.gain must be one of 128, 64, 32");
        }
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }

        // Sampling
        if self.sampling.sample_rate_hz == 0 {
            eyre::bail!("sampling.sample_rate_hz must be > 0");
        }
        if self.sampling.sample_rate_hz > 1000 {
            eyre::bail!("sampling.sample_rate_hz is unreasonably large (>1000)");
        }

        // Calibration
        if self.calibration.tare_samples == 0 {
            eyre::bail!("calibration.tare_samples must be >= 1");
        }
        if self.calibration.samples == 0 {
            eyre::bail!("calibration.samples must be >= 1");
        }
        if self.calibration.max_attempts < self.calibration.samples.max(self.calibration.tare_samples)
        {
            eyre::bail!("calibration.max_attempts must be >= samples and tare_samples");
        }
        if self.calibration.settle_ms > 10_000 {
            eyre::bail!("calibration.settle_ms is unreasonably large (>10s)");
        }
        if self.calibration.file.as_os_str().is_empty() {
            eyre::bail!("calibration.file must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// Why a persisted calibration record could not be used.
#[derive(Debug, Error)]
pub enum CalibrationFileError {
    #[error("calibration file is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("calibration file must contain a JSON object")]
    NotAnObject,
    #[error("calibration file is missing field '{0}'")]
    MissingField(String),
    #[error("calibration field '{0}' has the wrong type")]
    WrongType(String),
}

/// The two calibration scalars for one channel, as stored on disk.
///
/// On-disk shape (channel A):
/// ```json
/// {
///   "offset_a": 8388,
///   "reference_unit_a": 2.0
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedCalibration {
    /// Zero offset in raw counts.
    pub offset: i64,
    /// Raw counts per unit of weight.
    pub reference_unit: f64,
}

impl PersistedCalibration {
    fn offset_key(channel_key: &str) -> String {
        format!("offset_{channel_key}")
    }

    fn reference_unit_key(channel_key: &str) -> String {
        format!("reference_unit_{channel_key}")
    }

    /// Parse the record for `channel_key` ("a" or "b"). Both fields are required.
    pub fn from_json(text: &str, channel_key: &str) -> Result<Self, CalibrationFileError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let obj = value.as_object().ok_or(CalibrationFileError::NotAnObject)?;

        let offset_key = Self::offset_key(channel_key);
        let offset = match obj.get(&offset_key) {
            None => return Err(CalibrationFileError::MissingField(offset_key)),
            Some(v) => v
                .as_i64()
                .ok_or(CalibrationFileError::WrongType(offset_key))?,
        };

        let unit_key = Self::reference_unit_key(channel_key);
        let reference_unit = match obj.get(&unit_key) {
            None => return Err(CalibrationFileError::MissingField(unit_key)),
            Some(v) => v.as_f64().ok_or(CalibrationFileError::WrongType(unit_key))?,
        };

        Ok(Self {
            offset,
            reference_unit,
        })
    }

    /// Render the record for `channel_key` as pretty JSON (two-space indent).
    pub fn to_json(&self, channel_key: &str) -> Result<String, CalibrationFileError> {
        let mut obj = serde_json::Map::new();
        obj.insert(Self::offset_key(channel_key), self.offset.into());
        let unit = serde_json::Number::from_f64(self.reference_unit)
            .ok_or_else(|| CalibrationFileError::WrongType(Self::reference_unit_key(channel_key)))?;
        obj.insert(
            Self::reference_unit_key(channel_key),
            serde_json::Value::Number(unit),
        );
        let mut text = serde_json::to_string_pretty(&serde_json::Value::Object(obj))?;
        text.push('\n');
        Ok(text)
    }
}
