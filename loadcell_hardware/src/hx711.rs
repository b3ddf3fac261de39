use std::time::Duration;
use tracing::trace;

use crate::Gain;
use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_low_with_timeout};

/// Bit-banged HX711 over two GPIO lines (DOUT input, PD_SCK output).
pub struct Hx711 {
    dt: rppal::gpio::InputPin,
    sck: rppal::gpio::OutputPin,
    gain: Gain,
    /// False until one conversion has been clocked out with our gain pulses.
    primed: bool,
}

impl Hx711 {
    pub fn new(dt_pin: u8, sck_pin: u8, gain: Gain) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
            .into_input();
        let mut sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
            .into_output();
        sck.set_low(); // clock idle low keeps the chip powered up
        Ok(Self {
            dt,
            sck,
            gain,
            primed: gain.is_power_on_default(),
        })
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Read one conversion taken with the configured gain.
    ///
    /// Until the first set of gain pulses has been clocked, the chip still
    /// converts with its power-on A/128 setting; that conversion is discarded.
    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        if !self.primed {
            let discarded = self.convert(timeout)?;
            self.primed = true;
            trace!(raw = discarded, gain = self.gain.factor(), "hx711 gain primed");
        }
        self.convert(timeout)
    }

    /// Read one 24-bit conversion, then clock the gain pulses that select the
    /// channel/gain of the *next* conversion.
    fn convert(&mut self, timeout: Duration) -> Result<i32> {
        let dt = &self.dt;
        wait_until_low_with_timeout(|| dt.is_high(), timeout, Duration::from_micros(200))?;

        // MSB first
        let mut word: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay();
            word = (word << 1) | u32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay();
        }

        for _ in 0..(self.gain.pulses() - 24) {
            self.sck.set_high();
            spin_delay();
            self.sck.set_low();
            spin_delay();
        }

        let value = sign_extend_24(word);
        trace!(raw = value, gain = self.gain.factor(), "hx711 raw read");
        Ok(value)
    }
}

#[inline(always)]
fn spin_delay() {
    // PD_SCK high time must stay under 50 µs; a few cycles are plenty.
    std::hint::spin_loop();
}
