#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Load-cell sampling and calibration (hardware-agnostic).
//!
//! All hardware interaction goes through the `loadcell_traits::LoadCell` trait.
//!
//! ## Architecture
//!
//! - **Store**: durable calibration parameters (`store` module)
//! - **Engine**: tare and known-weight calibration (`engine` module)
//! - **Conversion**: raw → weight with a guarded division (`calibration` module)
//! - **Live reading**: sampler thread, delivery thread, atomic weight slot
//!   (`sampler`, `live`, `slot` modules)
//! - **Facade**: `LoadCellScale`, built with `LoadCellScale::builder()`
//!
//! ```no_run
//! use loadcell_core::{FileStore, LoadCellScale};
//! # fn source() -> Box<dyn loadcell_traits::LoadCell + Send> { unimplemented!() }
//! # fn main() -> eyre::Result<()> {
//! let scale = LoadCellScale::builder()
//!     .with_source(source())
//!     .with_store(FileStore::new("scale_config.json"))
//!     .build()?;
//! scale.calibrate(750.0)?;
//! scale.start_reading()?;
//! println!("{:.1} g", scale.get_weight());
//! scale.stop_reading();
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod hw_error;
pub mod live;
pub mod mocks;
pub mod sampler;
pub mod scale;
pub mod slot;
pub mod status;
pub mod store;
pub mod util;

pub use builder::{Missing, ScaleBuilder};
pub use calibration::{CalibrationParameters, ConvertError, SharedCalibration, convert};
pub use config::{CalibrationCfg, SamplingMode, Timeouts};
pub use engine::CalibrationEngine;
pub use error::{BuildError, Report, Result, ScaleError};
pub use live::LiveReader;
pub use scale::{AutoTare, LoadCellScale, Startup};
pub use status::{LiveStats, ReadingState};
pub use store::{
    CalibrationStore, FileStore, LoadFailure, LoadOutcome, MemoryStore, SaveOutcome, StoreError,
};
