pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing the sampling-source boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Analog input path on the amplifier.
///
/// The HX711 exposes channel A (gain 128 or 64) and channel B (gain 32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    #[default]
    A,
    B,
}

impl Channel {
    /// Lowercase suffix used to key persisted calibration fields (`offset_a`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Channel::A => "a",
            Channel::B => "b",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Channel::A => f.write_str("A"),
            Channel::B => f.write_str("B"),
        }
    }
}

/// A source of raw ADC samples from a load cell amplifier.
///
/// `read` blocks until the next conversion is ready or `timeout` expires.
/// An `Err` means "no sample this tick"; callers skip it and try again.
pub trait LoadCell {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError>;

    /// Channel the samples belong to.
    fn channel(&self) -> Channel {
        Channel::A
    }
}

impl<T: LoadCell + ?Sized> LoadCell for Box<T> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError> {
        (**self).read(timeout)
    }

    fn channel(&self) -> Channel {
        (**self).channel()
    }
}
