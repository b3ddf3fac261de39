//! Test and helper sources for loadcell_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use loadcell_traits::{BoxError, Channel, LoadCell};

/// A source that never has a sample ready. Tare and calibrate against it fail
/// with a sensor timeout once the attempt budget runs out.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLoadCell;

impl LoadCell for NoopLoadCell {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        Err(Box::new(std::io::Error::other("noop load cell: not ready")))
    }
}

#[derive(Debug)]
struct Script {
    queue: VecDeque<Option<i32>>,
    /// Returned once the queue is empty; `None` means "not ready".
    fallback: Option<i32>,
    reads: u64,
}

/// Source that replays queued readings, then repeats a fallback value.
///
/// A queued `None` is a tick with no sample. The paired [`ScriptHandle`]
/// changes the script while the source is owned by a scale.
#[derive(Debug)]
pub struct ScriptedLoadCell {
    script: Arc<Mutex<Script>>,
    channel: Channel,
    delay: Duration,
}

/// Shared control over a [`ScriptedLoadCell`].
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedLoadCell {
    /// Constant reading `raw` on every tick.
    pub fn constant(raw: i32) -> Self {
        Self::from_parts(VecDeque::new(), Some(raw))
    }

    /// Replay `readings` in order, then report "not ready" forever.
    pub fn sequence(readings: impl IntoIterator<Item = Option<i32>>) -> Self {
        Self::from_parts(readings.into_iter().collect(), None)
    }

    fn from_parts(queue: VecDeque<Option<i32>>, fallback: Option<i32>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                queue,
                fallback,
                reads: 0,
            })),
            channel: Channel::A,
            delay: Duration::ZERO,
        }
    }

    /// Block this long on every read, like a sensor waiting for data-ready.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            script: self.script.clone(),
        }
    }
}

impl ScriptHandle {
    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut g = match self.script.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut g)
    }

    /// Drop anything queued and read `raw` from now on.
    pub fn set_constant(&self, raw: i32) {
        self.with(|s| {
            s.queue.clear();
            s.fallback = Some(raw);
        });
    }

    /// Queue more readings ahead of the fallback.
    pub fn push(&self, readings: impl IntoIterator<Item = Option<i32>>) {
        self.with(|s| s.queue.extend(readings));
    }

    /// Report "not ready" once the queue is drained.
    pub fn go_silent(&self) {
        self.with(|s| s.fallback = None);
    }

    /// Number of `read` calls so far, including ones that produced no sample.
    pub fn reads(&self) -> u64 {
        self.with(|s| s.reads)
    }
}

impl LoadCell for ScriptedLoadCell {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let next = self.handle().with(|s| {
            s.reads += 1;
            match s.queue.pop_front() {
                Some(item) => item,
                None => s.fallback,
            }
        });
        next.ok_or_else(|| Box::new(std::io::Error::other("scripted load cell: not ready")) as BoxError)
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_then_not_ready() {
        let mut cell = ScriptedLoadCell::sequence([Some(1), None, Some(3)]);
        let t = Duration::from_millis(1);
        assert_eq!(cell.read(t).unwrap(), 1);
        assert!(cell.read(t).is_err());
        assert_eq!(cell.read(t).unwrap(), 3);
        assert!(cell.read(t).is_err());
        assert_eq!(cell.handle().reads(), 4);
    }

    #[test]
    fn handle_retargets_a_running_source() {
        let mut cell = ScriptedLoadCell::constant(10);
        let h = cell.handle();
        let t = Duration::from_millis(1);
        assert_eq!(cell.read(t).unwrap(), 10);
        h.set_constant(20);
        assert_eq!(cell.read(t).unwrap(), 20);
        h.push([Some(7)]);
        assert_eq!(cell.read(t).unwrap(), 7);
        assert_eq!(cell.read(t).unwrap(), 20);
    }
}
