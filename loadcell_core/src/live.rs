//! Live reading controller.
//!
//! `start_reading` spawns a [`Sampler`] (producer) and a delivery thread
//! (consumer). The delivery thread is the only writer of the weight slot: it
//! converts each sample with the calibration in effect at that moment and
//! publishes the result. Readers call `get_weight` from any thread.
//!
//! Registration state lives behind one mutex; start, stop and pauses for
//! calibration all go through it, so they never race with each other. The
//! lock is held only while registering or joining a session, never across a
//! calibration: a paused reader records whether to resume, and a
//! `stop_reading` during the pause clears that.

use crossbeam_channel as xch;
use loadcell_traits::LoadCell;
use loadcell_traits::clock::Clock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::calibration::{ConvertError, SharedCalibration, convert};
use crate::config::{SamplingMode, Timeouts};
use crate::error::Result;
use crate::sampler::{Sample, Sampler};
use crate::slot::WeightSlot;
use crate::status::{LiveStats, ReadingState};
use eyre::WrapErr;

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    converted: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LiveStats {
        LiveStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            converted: self.converted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

struct Session {
    /// Dropping this sender wakes the delivery thread and ends the session.
    stop_tx: xch::Sender<()>,
    delivery: JoinHandle<()>,
}

impl Session {
    /// Signal the delivery thread and wait for it (and its sampler) to exit.
    fn end(self) {
        drop(self.stop_tx);
        if let Err(e) = self.delivery.join() {
            tracing::warn!(?e, "delivery thread panicked");
        }
    }
}

enum Registration {
    Idle,
    Active(Session),
    /// Calibration holds the source; `depth` counts overlapping pauses.
    Paused { depth: usize, resume: bool },
}

pub struct LiveReader<S> {
    source: Arc<Mutex<S>>,
    calibration: SharedCalibration,
    mode: SamplingMode,
    timeouts: Timeouts,
    clock: Arc<dyn Clock + Send + Sync>,
    weight: Arc<WeightSlot>,
    counters: Arc<Counters>,
    registration: Mutex<Registration>,
    active: AtomicBool,
}

impl<S> core::fmt::Debug for LiveReader<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LiveReader")
            .field("mode", &self.mode)
            .field("active", &self.is_reading())
            .field("weight", &self.get_weight())
            .finish()
    }
}

impl<S> LiveReader<S> {
    /// Last successfully converted weight; 0.0 until the first conversion.
    pub fn get_weight(&self) -> f64 {
        self.weight.load()
    }

    pub fn is_reading(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ReadingState {
        if self.is_reading() {
            ReadingState::Active
        } else {
            ReadingState::Idle
        }
    }

    pub fn stats(&self) -> LiveStats {
        self.counters.snapshot()
    }

    /// Wait until at least `total` conversions have been published (counted
    /// across sessions). Returns false on timeout.
    pub fn wait_for_conversions(&self, total: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.counters.converted.load(Ordering::Acquire) >= total {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl<S: LoadCell + Send + 'static> LiveReader<S> {
    pub fn new(
        source: Arc<Mutex<S>>,
        calibration: SharedCalibration,
        mode: SamplingMode,
        timeouts: Timeouts,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            source,
            calibration,
            mode,
            timeouts,
            clock,
            weight: Arc::new(WeightSlot::default()),
            counters: Arc::new(Counters::default()),
            registration: Mutex::new(Registration::Idle),
            active: AtomicBool::new(false),
        }
    }

    /// Idle → Active. No-op when already active.
    ///
    /// During a calibration pause this only arms the resume; delivery starts
    /// once the calibration finishes.
    pub fn start_reading(&self) -> Result<()> {
        let mut reg = self.lock_registration();
        match &mut *reg {
            Registration::Active(_) => {
                tracing::debug!("start_reading: already active");
                return Ok(());
            }
            Registration::Paused { resume, .. } => {
                *resume = true;
                tracing::debug!("start_reading: resumes after calibration");
                return Ok(());
            }
            Registration::Idle => {}
        }
        *reg = Registration::Active(self.spawn_session()?);
        self.active.store(true, Ordering::Release);
        tracing::info!(mode = ?self.mode, "live reading started");
        Ok(())
    }

    /// Active → Idle. No-op when already idle. Blocks until both threads exit.
    ///
    /// During a calibration pause no threads run; this cancels the resume.
    pub fn stop_reading(&self) {
        let mut reg = self.lock_registration();
        match std::mem::replace(&mut *reg, Registration::Idle) {
            Registration::Active(session) => {
                session.end();
                self.active.store(false, Ordering::Release);
                tracing::info!("live reading stopped");
            }
            Registration::Paused { depth, resume } => {
                *reg = Registration::Paused {
                    depth,
                    resume: false,
                };
                if resume {
                    tracing::info!("live reading stopped during calibration");
                }
            }
            Registration::Idle => tracing::debug!("stop_reading: already idle"),
        }
    }

    /// Run `f` with live reading suspended, resuming afterwards if reading
    /// is still wanted then.
    ///
    /// Calibration reads the source directly; pausing keeps the sampler from
    /// competing for it. `get_weight` keeps returning the last value meanwhile
    /// and `is_reading` is false.
    pub fn paused<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        {
            let mut reg = self.lock_registration();
            let next = match std::mem::replace(&mut *reg, Registration::Idle) {
                Registration::Active(session) => {
                    session.end();
                    self.active.store(false, Ordering::Release);
                    tracing::debug!("live reading paused");
                    Registration::Paused {
                        depth: 1,
                        resume: true,
                    }
                }
                Registration::Paused { depth, resume } => Registration::Paused {
                    depth: depth + 1,
                    resume,
                },
                Registration::Idle => Registration::Paused {
                    depth: 1,
                    resume: false,
                },
            };
            *reg = next;
        }

        let out = f();

        let mut reg = self.lock_registration();
        let finished = match &mut *reg {
            Registration::Paused { depth, resume } => {
                *depth -= 1;
                (*depth == 0).then_some(*resume)
            }
            _ => None,
        };
        if let Some(resume) = finished {
            *reg = Registration::Idle;
            if resume {
                let session = self
                    .spawn_session()
                    .map_err(|e| e.wrap_err("resume live reading"))?;
                *reg = Registration::Active(session);
                self.active.store(true, Ordering::Release);
                tracing::debug!("live reading resumed");
            }
        }
        Ok(out)
    }

    fn lock_registration(&self) -> MutexGuard<'_, Registration> {
        match self.registration.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn spawn_session(&self) -> Result<Session> {
        let sampler = Sampler::spawn(
            self.source.clone(),
            self.mode,
            self.timeouts.sensor(),
            self.clock.clone(),
        );
        let (stop_tx, stop_rx) = xch::bounded::<()>(0);
        let delivery = Delivery {
            calibration: self.calibration.clone(),
            weight: self.weight.clone(),
            counters: self.counters.clone(),
            warned: false,
        };
        let handle = std::thread::Builder::new()
            .name("loadcell-delivery".into())
            .spawn(move || delivery.run(sampler, stop_rx))
            .wrap_err("spawn delivery thread")?;
        Ok(Session {
            stop_tx,
            delivery: handle,
        })
    }
}

impl<S> Drop for LiveReader<S> {
    fn drop(&mut self) {
        let reg = match self.registration.get_mut() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Registration::Active(session) = std::mem::replace(reg, Registration::Idle) {
            session.end();
        }
    }
}

/// Consumer half of a session; runs on the delivery thread.
struct Delivery {
    calibration: SharedCalibration,
    weight: Arc<WeightSlot>,
    counters: Arc<Counters>,
    /// First rejection per session is a warning, the rest are debug.
    warned: bool,
}

impl Delivery {
    fn run(mut self, sampler: Sampler, stop_rx: xch::Receiver<()>) {
        loop {
            xch::select! {
                recv(sampler.receiver()) -> msg => match msg {
                    Ok(sample) => self.deliver(sample),
                    Err(_) => break,
                },
                recv(stop_rx) -> _ => break,
            }
        }
        // Joins the sampler thread.
        drop(sampler);
    }

    fn deliver(&mut self, sample: Sample) {
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        let params = self.calibration.get();
        let result = if sample.channel == params.channel {
            convert(sample.raw, &params)
        } else {
            Err(ConvertError::ChannelMismatch {
                expected: params.channel,
                got: sample.channel,
            })
        };
        match result {
            Ok(weight) => {
                self.weight.store(weight);
                self.counters.converted.fetch_add(1, Ordering::Release);
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                if self.warned {
                    tracing::debug!(raw = sample.raw, error = %e, "sample rejected");
                } else {
                    self.warned = true;
                    tracing::warn!(raw = sample.raw, error = %e, "sample rejected; keeping last weight");
                }
            }
        }
    }
}
