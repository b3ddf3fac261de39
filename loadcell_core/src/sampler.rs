//! Background sampling thread.
//!
//! Owns the read loop against the shared `LoadCell`, and pushes each raw sample
//! into a bounded channel. The channel keeps only the newest samples: when the
//! consumer falls behind, the oldest queued sample is evicted.
//!
//! Each `Sampler` spawns exactly one thread, shut down and joined on drop.
use crossbeam_channel as xch;
use loadcell_traits::clock::Clock;
use loadcell_traits::{Channel, LoadCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SamplingMode;
use crate::hw_error::trace_read_failure;

/// Queue depth between the sampling thread and its consumer.
const QUEUE_DEPTH: usize = 4;
/// Back-off after a failed read in event mode, so a dead sensor does not spin.
const EVENT_RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// One raw reading tagged with the channel it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub channel: Channel,
    pub raw: i32,
}

pub struct Sampler {
    rx: xch::Receiver<Sample>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn<S, C>(source: Arc<Mutex<S>>, mode: SamplingMode, timeout: Duration, clock: C) -> Self
    where
        S: LoadCell + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded(QUEUE_DEPTH);
        let evict = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let period = match mode {
            SamplingMode::Event => None,
            SamplingMode::Paced(hz) => Some(Duration::from_micros(crate::util::period_us(hz))),
        };

        let join_handle = std::thread::spawn(move || {
            tracing::debug!(?mode, "sampler thread started");
            loop {
                if shutdown_thread.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                // Guard is released before publishing so calibration can reach the source.
                let read = match source.lock() {
                    Ok(mut cell) => {
                        let channel = cell.channel();
                        cell.read(timeout).map(|raw| Sample { channel, raw })
                    }
                    Err(_) => {
                        tracing::error!("sampling source lock poisoned; sampler exiting");
                        break;
                    }
                };

                match read {
                    Ok(sample) => {
                        tracing::trace!(raw = sample.raw, channel = %sample.channel, "sample");
                        publish_latest(&tx, &evict, sample);
                    }
                    Err(e) => {
                        trace_read_failure(e.as_ref(), "sampler");
                        if period.is_none() {
                            clock.sleep(EVENT_RETRY_BACKOFF);
                        }
                    }
                }

                if let Some(period) = period {
                    if shutdown_thread.load(Ordering::Relaxed) {
                        break;
                    }
                    clock.sleep(period);
                }
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Receiver side, for `select!` in the consumer.
    pub fn receiver(&self) -> &xch::Receiver<Sample> {
        &self.rx
    }
}

/// Send without blocking; when the queue is full, drop the oldest entry first.
fn publish_latest(tx: &xch::Sender<Sample>, evict: &xch::Receiver<Sample>, sample: Sample) {
    match tx.try_send(sample) {
        Ok(()) => {}
        Err(xch::TrySendError::Full(sample)) => {
            let _ = evict.try_recv();
            let _ = tx.try_send(sample);
        }
        // Cannot happen while `evict` is alive.
        Err(xch::TrySendError::Disconnected(_)) => {}
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits at its next shutdown check: immediately if it is
        // between reads, otherwise after the in-flight read (bounded by the
        // sensor timeout) or the pacing sleep.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("sampler thread joined"),
                Err(e) => tracing::warn!(?e, "sampler thread panicked during shutdown"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_evicts_oldest() {
        let (tx, rx) = xch::bounded(2);
        let evict = rx.clone();
        for raw in 1..=5 {
            publish_latest(
                &tx,
                &evict,
                Sample {
                    channel: Channel::A,
                    raw,
                },
            );
        }
        let seen: Vec<i32> = rx.try_iter().map(|s| s.raw).collect();
        assert_eq!(seen, vec![4, 5]);
    }
}
