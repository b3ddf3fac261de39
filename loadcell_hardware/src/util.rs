use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (DOUT pulled low by the
/// HX711 once a conversion is ready), or `timeout` expires. Sleeps `poll_interval`
/// between checks instead of spinning.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Sign-extend a 24-bit two's complement HX711 word into an `i32`.
#[inline]
pub fn sign_extend_24(word: u32) -> i32 {
    let word = word & 0x00FF_FFFF;
    if word & 0x0080_0000 != 0 {
        (word | 0xFF00_0000) as i32
    } else {
        word as i32
    }
}

#[cfg(test)]
mod tests {
    use super::sign_extend_24;

    #[test]
    fn sign_extension_covers_both_halves() {
        assert_eq!(sign_extend_24(0x00_0000), 0);
        assert_eq!(sign_extend_24(0x7F_FFFF), 8_388_607);
        assert_eq!(sign_extend_24(0x80_0000), -8_388_608);
        assert_eq!(sign_extend_24(0xFF_FFFF), -1);
    }

    #[test]
    fn upper_byte_is_ignored() {
        assert_eq!(sign_extend_24(0xAB00_0001), 1);
    }
}
