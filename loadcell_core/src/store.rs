//! Durable storage for calibration parameters.
//!
//! `load` never fails: any problem yields defaults plus a typed reason so the
//! caller can log it. `save` failures are returned to the caller, who treats
//! them as warnings; the in-memory calibration stays valid either way.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use loadcell_config::{CalibrationFileError, PersistedCalibration};
use loadcell_traits::Channel;
use thiserror::Error;

use crate::atomic::write_atomic;
use crate::calibration::CalibrationParameters;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write calibration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode calibration: {0}")]
    Encode(#[from] CalibrationFileError),
    #[error("calibration store unavailable: {0}")]
    Unavailable(String),
}

/// Why `load` fell back to defaults.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("no calibration stored yet")]
    Missing,
    #[error("read calibration: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Malformed(#[from] CalibrationFileError),
    #[error("stored reference unit {0} is unusable")]
    InvalidReferenceUnit(f64),
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(CalibrationParameters),
    Defaulted {
        params: CalibrationParameters,
        reason: LoadFailure,
    },
}

impl LoadOutcome {
    pub fn params(&self) -> CalibrationParameters {
        match self {
            LoadOutcome::Loaded(p) => *p,
            LoadOutcome::Defaulted { params, .. } => *params,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    fn from_text(text: &str, channel: Channel) -> Self {
        let defaulted = |reason| LoadOutcome::Defaulted {
            params: CalibrationParameters::defaults(channel),
            reason,
        };
        match PersistedCalibration::from_json(text, channel.key()) {
            Ok(rec) => {
                let params = CalibrationParameters::from_persisted(&rec, channel);
                if params.is_calibrated() {
                    LoadOutcome::Loaded(params)
                } else {
                    defaulted(LoadFailure::InvalidReferenceUnit(rec.reference_unit))
                }
            }
            Err(e) => defaulted(LoadFailure::Malformed(e)),
        }
    }
}

/// Result of persisting after a successful tare/calibrate.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    /// Calibration is active in memory but will not survive a restart.
    Unsaved(StoreError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

pub trait CalibrationStore {
    fn load(&self, channel: Channel) -> LoadOutcome;
    fn save(&self, channel: Channel, params: &CalibrationParameters) -> Result<(), StoreError>;
    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// JSON file at an explicit path, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileStore {
    fn load(&self, channel: Channel) -> LoadOutcome {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => LoadOutcome::from_text(&text, channel),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LoadOutcome::Defaulted {
                params: CalibrationParameters::defaults(channel),
                reason: LoadFailure::Missing,
            },
            Err(e) => LoadOutcome::Defaulted {
                params: CalibrationParameters::defaults(channel),
                reason: LoadFailure::Io(e),
            },
        }
    }

    fn save(&self, channel: Channel, params: &CalibrationParameters) -> Result<(), StoreError> {
        let text = PersistedCalibration::from(params).to_json(channel.key())?;
        write_atomic(&self.path, text.as_bytes()).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "calibration saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store holding the serialized record. Used for tests and runs
/// that should not touch the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    text: Mutex<Option<String>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw stored content, valid or not.
    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(Some(text.into())),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail, as a full or read-only disk would.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }

    pub fn contents(&self) -> Option<String> {
        self.text.lock().ok().and_then(|g| g.clone())
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&self, channel: Channel) -> LoadOutcome {
        match self.contents() {
            Some(text) => LoadOutcome::from_text(&text, channel),
            None => LoadOutcome::Defaulted {
                params: CalibrationParameters::defaults(channel),
                reason: LoadFailure::Missing,
            },
        }
    }

    fn save(&self, channel: Channel, params: &CalibrationParameters) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        let text = PersistedCalibration::from(params).to_json(channel.key())?;
        let mut g = self
            .text
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        *g = Some(text);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl<T: CalibrationStore + ?Sized> CalibrationStore for std::sync::Arc<T> {
    fn load(&self, channel: Channel) -> LoadOutcome {
        (**self).load(channel)
    }

    fn save(&self, channel: Channel, params: &CalibrationParameters) -> Result<(), StoreError> {
        (**self).save(channel, params)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
