//! Live reading state.

/// Lifecycle of the live reading controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingState {
    /// No sampler running; `get_weight` returns the last value.
    #[default]
    Idle,
    /// Sampler and delivery threads are running.
    Active,
}

/// Counters for samples seen by the delivery thread, across all sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveStats {
    /// Samples received from the sampler.
    pub delivered: u64,
    /// Samples converted and published to the weight slot.
    pub converted: u64,
    /// Samples dropped because conversion failed.
    pub rejected: u64,
}
