use std::fmt;

/// Read-only copy of the ledger totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Snapshot {
    /// Bytes outstanding right now
    pub current_live: u64,
    /// Sum of live bytes sampled after every event
    pub cumulative_sum: u64,
    /// Events recorded since `init`
    pub event_count: u64,
    /// Highest live byte count seen
    pub max_live: u64,
    /// Average live bytes across events (0 before the first event)
    pub average_live: u64,
}

impl Snapshot {
    /// `current_live` read as a two's-complement value
    ///
    /// Negative only when more bytes were freed than allocated.
    pub fn current_live_signed(&self) -> i64 {
        self.current_live as i64
    }

    /// Whether any event has been recorded
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Allocation request: {}, Max Needed: {}, Average Need: {}",
            self.event_count, self.max_live, self.average_live
        )
    }
}
