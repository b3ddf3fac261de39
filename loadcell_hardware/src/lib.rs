//! Sampling sources for the load cell: a simulated amplifier for host builds and
//! tests, and (feature `hardware`) a bit-banged HX711 on Raspberry Pi GPIO.
pub mod error;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hx711;

use loadcell_traits::{BoxError, Channel, LoadCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::time::Duration;

use crate::error::HwError;

/// HX711 gain/channel selection, encoded as the total clock pulses per read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128 (25 pulses).
    #[default]
    A128,
    /// Channel B, gain 32 (26 pulses).
    B32,
    /// Channel A, gain 64 (27 pulses).
    A64,
}

impl Gain {
    pub fn pulses(self) -> u8 {
        match self {
            Gain::A128 => 25,
            Gain::B32 => 26,
            Gain::A64 => 27,
        }
    }

    pub fn factor(self) -> u8 {
        match self {
            Gain::A128 => 128,
            Gain::B32 => 32,
            Gain::A64 => 64,
        }
    }

    pub fn channel(self) -> Channel {
        match self {
            Gain::A128 | Gain::A64 => Channel::A,
            Gain::B32 => Channel::B,
        }
    }

    /// Whether the chip converts with this gain straight after power-on.
    /// Any other gain takes effect only from the second conversion.
    pub fn is_power_on_default(self) -> bool {
        self == Gain::A128
    }
}

impl TryFrom<u8> for Gain {
    type Error = HwError;

    fn try_from(factor: u8) -> Result<Self, Self::Error> {
        match factor {
            128 => Ok(Gain::A128),
            64 => Ok(Gain::A64),
            32 => Ok(Gain::B32),
            other => Err(HwError::UnsupportedGain(other)),
        }
    }
}

/// Shared knob for a [`SimulatedLoadCell`]; tests and the CLI use it to move the
/// simulated raw value while a sampler thread owns the cell.
#[derive(Debug, Clone)]
pub struct SimHandle {
    raw: Arc<AtomicI32>,
    reads: Arc<AtomicU32>,
}

impl SimHandle {
    pub fn set_raw(&self, raw: i32) {
        self.raw.store(raw, Ordering::Relaxed);
    }

    pub fn raw(&self) -> i32 {
        self.raw.load(Ordering::Relaxed)
    }

    /// Number of successful reads served so far.
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }
}

/// Simulated amplifier returning a settable raw value at a fixed data-ready period.
pub struct SimulatedLoadCell {
    handle: SimHandle,
    period: Duration,
    channel: Channel,
}

impl SimulatedLoadCell {
    /// A cell producing `raw` at the HX711's 10 SPS default rate.
    pub fn new(raw: i32) -> Self {
        Self {
            handle: SimHandle {
                raw: Arc::new(AtomicI32::new(raw)),
                reads: Arc::new(AtomicU32::new(0)),
            },
            period: Duration::from_millis(100),
            channel: Channel::A,
        }
    }

    /// Override the data-ready period (zero makes reads return immediately).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl Default for SimulatedLoadCell {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LoadCell for SimulatedLoadCell {
    fn read(&mut self, timeout: Duration) -> Result<i32, BoxError> {
        if self.period > timeout {
            std::thread::sleep(timeout);
            return Err(Box::new(HwError::DataReadyTimeout));
        }
        if !self.period.is_zero() {
            std::thread::sleep(self.period);
        }
        self.handle.reads.fetch_add(1, Ordering::Relaxed);
        let raw = self.handle.raw();
        tracing::trace!(raw, "simulated hx711 read");
        Ok(raw)
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}

#[cfg(feature = "hardware")]
pub struct HardwareLoadCell {
    hx711: hx711::Hx711,
    max_retries: u32,
}

#[cfg(feature = "hardware")]
impl HardwareLoadCell {
    pub fn try_new(dt_pin: u8, sck_pin: u8, gain: Gain) -> error::Result<Self> {
        let hx711 = hx711::Hx711::new(dt_pin, sck_pin, gain)?;
        Ok(Self {
            hx711,
            max_retries: 3,
        })
    }
}

#[cfg(feature = "hardware")]
impl LoadCell for HardwareLoadCell {
    fn read(&mut self, timeout: Duration) -> Result<i32, BoxError> {
        let mut attempts = 0;
        loop {
            match self.hx711.read_with_timeout(timeout) {
                Ok(raw) => {
                    tracing::debug!(raw, "hx711 sample");
                    return Ok(raw);
                }
                Err(HwError::DataReadyTimeout) if attempts < self.max_retries => {
                    attempts += 1;
                    tracing::warn!(retries = attempts, "hx711 not ready, retrying");
                }
                Err(e) => {
                    tracing::error!(error = %e, "hx711 read error");
                    return Err(Box::new(e));
                }
            }
        }
    }

    fn channel(&self) -> Channel {
        self.hx711.gain().channel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(128, Gain::A128, 25, Channel::A)]
    #[case(64, Gain::A64, 27, Channel::A)]
    #[case(32, Gain::B32, 26, Channel::B)]
    fn gain_table(
        #[case] factor: u8,
        #[case] gain: Gain,
        #[case] pulses: u8,
        #[case] channel: Channel,
    ) {
        let g = Gain::try_from(factor).unwrap();
        assert_eq!(g, gain);
        assert_eq!(g.pulses(), pulses);
        assert_eq!(g.channel(), channel);
        assert_eq!(g.factor(), factor);
    }

    #[rstest]
    #[case(Gain::A128, true)]
    #[case(Gain::A64, false)]
    #[case(Gain::B32, false)]
    fn only_a128_is_live_at_power_on(#[case] gain: Gain, #[case] live: bool) {
        assert_eq!(gain.is_power_on_default(), live);
    }

    #[test]
    fn rejects_unknown_gain() {
        let err = Gain::try_from(16).expect_err("16 is not an hx711 gain");
        assert!(matches!(err, HwError::UnsupportedGain(16)));
    }

    #[test]
    fn simulated_cell_follows_handle() {
        let mut cell = SimulatedLoadCell::new(500).with_period(Duration::ZERO);
        let handle = cell.handle();
        assert_eq!(cell.read(Duration::from_millis(10)).unwrap(), 500);
        handle.set_raw(-42);
        assert_eq!(cell.read(Duration::from_millis(10)).unwrap(), -42);
        assert_eq!(handle.reads(), 2);
    }

    #[test]
    fn simulated_cell_times_out_when_period_exceeds_timeout() {
        let mut cell = SimulatedLoadCell::new(1).with_period(Duration::from_millis(50));
        let err = cell.read(Duration::from_millis(1)).expect_err("period > timeout");
        assert!(err.to_string().contains("timeout"));
        assert_eq!(cell.handle().reads(), 0);
    }
}
