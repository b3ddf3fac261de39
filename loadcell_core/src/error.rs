use thiserror::Error;

/// Failures of the public scale operations.
///
/// None of these are fatal: a failed tare or calibrate leaves the last
/// known-good calibration in effect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("sensor timeout: no valid samples after {attempts} attempts")]
    SensorTimeout { attempts: u32 },
    #[error("scale is uncalibrated: {0}")]
    Uncalibrated(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
