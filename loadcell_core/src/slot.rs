use std::sync::atomic::{AtomicU64, Ordering};

/// Latest converted weight, shared between one writer (the delivery thread)
/// and any number of readers.
///
/// Stored as the `f64` bit pattern in a single atomic word, so a read returns
/// either the previous or the new value, never a mix.
#[derive(Debug)]
pub struct WeightSlot {
    bits: AtomicU64,
}

impl WeightSlot {
    pub fn new(initial: f64) -> Self {
        Self {
            bits: AtomicU64::new(initial.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, weight: f64) {
        self.bits.store(weight.to_bits(), Ordering::Release);
    }
}

impl Default for WeightSlot {
    fn default() -> Self {
        Self::new(0.0)
    }
}
