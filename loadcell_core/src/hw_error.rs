//! Classifies `Box<dyn Error>` values from the `LoadCell` trait boundary.
//!
//! A failed read is never fatal to sampling; the classification only decides
//! whether the tick is an expected "not ready yet" or worth a warning.

/// Why a sampling tick produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    /// Amplifier had no conversion ready within the read timeout.
    NotReady,
    /// Anything else (GPIO, I/O, driver bug).
    Fault(String),
}

/// Map a trait-boundary error to a [`ReadFailure`].
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn classify(e: &(dyn std::error::Error + 'static)) -> ReadFailure {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<loadcell_hardware::error::HwError>() {
            return match hw {
                loadcell_hardware::error::HwError::DataReadyTimeout => ReadFailure::NotReady,
                other => ReadFailure::Fault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("not ready") {
        ReadFailure::NotReady
    } else {
        ReadFailure::Fault(s)
    }
}

/// Log a failed read at a level matching its classification.
pub(crate) fn trace_read_failure(e: &(dyn std::error::Error + 'static), context: &'static str) {
    match classify(e) {
        ReadFailure::NotReady => tracing::trace!(context, "sample not ready"),
        ReadFailure::Fault(msg) => tracing::warn!(context, error = %msg, "sample read failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heuristics_without_downcast() {
        let e = std::io::Error::other("hx711 data-ready timeout");
        assert_eq!(classify(&e), ReadFailure::NotReady);
        let e = std::io::Error::other("gpio busy");
        assert_eq!(classify(&e), ReadFailure::Fault("gpio busy".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_hw_errors() {
        use loadcell_hardware::error::HwError;
        assert_eq!(classify(&HwError::DataReadyTimeout), ReadFailure::NotReady);
        assert!(matches!(
            classify(&HwError::Gpio("pin 23 busy".into())),
            ReadFailure::Fault(m) if m.contains("pin 23")
        ));
    }
}
