//! Runtime configuration for the scale.
//!
//! These are the structs the core consumes. They are separate from the
//! TOML-deserialized config in `loadcell_config`; see `conversions`.

/// Sampling budget for tare and calibrate.
#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    /// Raw samples averaged into the zero offset.
    pub tare_samples: u32,
    /// Offset-compensated samples averaged into the reference unit.
    pub samples: u32,
    /// Settling delay after each calibrate sample (ms).
    pub settle_ms: u64,
    /// Read attempts allowed per operation, including ticks with no sample.
    pub max_attempts: u32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            tare_samples: 15,
            samples: 20,
            settle_ms: 50,
            max_attempts: 60,
        }
    }
}

impl CalibrationCfg {
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        if self.tare_samples == 0 {
            return Err("tare_samples must be >= 1");
        }
        if self.samples == 0 {
            return Err("samples must be >= 1");
        }
        if self.max_attempts < self.samples.max(self.tare_samples) {
            return Err("max_attempts must cover samples and tare_samples");
        }
        Ok(())
    }
}

/// How the live sampler thread is paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Block on the amplifier's data-ready signal; no extra sleeps.
    #[default]
    Event,
    /// Read at a fixed rate in Hz.
    Paced(u32),
}

/// Timeouts.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Max sensor wait per read (ms).
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 150 }
    }
}

impl Timeouts {
    pub fn sensor(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sensor_ms)
    }
}
