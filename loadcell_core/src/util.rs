//! Common time/period helpers for loadcell_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 in release builds; debug builds assert.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    debug_assert!(hz > 0, "sample_rate_hz must be > 0");
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}
