//! Heap accounting ledger
//!
//! Tracks live bytes, peak live bytes and the average live bytes sampled at
//! every heap state change. O(1) per event, no allocation.

mod shared;
mod snapshot;

pub use shared::SharedLedger;
pub use snapshot::Snapshot;

use crate::event::{EventKind, HeapEvent};
use crate::LedgerError;

/// Running totals for one measurement session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    /// Outstanding bytes; wraps on inconsistent frees
    current_live: u64,
    /// Sum of `current_live` after every event
    cumulative_sum: u64,
    event_count: u64,
    max_live: u64,
    /// `cumulative_sum / event_count`, 0 before the first event
    average_live: u64,
}

impl Counters {
    fn apply(&mut self, kind: EventKind, new_size: u64, old_size: u64) {
        match kind {
            EventKind::Allocate | EventKind::AllocateZeroed => {
                self.current_live = self.current_live.wrapping_add(new_size);
            }
            EventKind::Free => {
                self.current_live = self.current_live.wrapping_sub(new_size);
            }
            EventKind::Resize => {
                self.current_live = self
                    .current_live
                    .wrapping_sub(old_size)
                    .wrapping_add(new_size);
            }
        }

        self.event_count += 1;
        self.cumulative_sum = self.cumulative_sum.wrapping_add(self.current_live);
        self.average_live = self.cumulative_sum / self.event_count;
        self.max_live = self.max_live.max(self.current_live);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_live: self.current_live,
            cumulative_sum: self.cumulative_sum,
            event_count: self.event_count,
            max_live: self.max_live,
            average_live: self.average_live,
        }
    }
}

/// Accounting ledger
///
/// Starts uninitialized; [`Ledger::init`] opens a session. Single-threaded:
/// callers serialize access themselves, or use [`SharedLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    /// `None` until `init`
    counters: Option<Counters>,
}

impl Ledger {
    /// Create an uninitialized ledger
    pub const fn new() -> Self {
        Self { counters: None }
    }

    /// Create a ledger with a session already open
    pub fn active() -> Self {
        let mut ledger = Self::new();
        ledger.init();
        ledger
    }

    /// Reset every field to zero and open a new session
    pub fn init(&mut self) {
        self.counters = Some(Counters::default());
    }

    /// Whether `init` has been called
    pub fn is_initialized(&self) -> bool {
        self.counters.is_some()
    }

    /// Record one heap event
    ///
    /// `old_size` is only read for [`EventKind::Resize`]. Sizes are trusted:
    /// a free of more than was allocated wraps `current_live`.
    pub fn record_event(
        &mut self,
        kind: EventKind,
        new_size: u64,
        old_size: u64,
    ) -> Result<(), LedgerError> {
        let counters = self.counters.as_mut().ok_or(LedgerError::NotInitialized)?;
        counters.apply(kind, new_size, old_size);
        Ok(())
    }

    /// Record a [`HeapEvent`]
    pub fn record(&mut self, event: HeapEvent) -> Result<(), LedgerError> {
        self.record_event(event.kind, event.new_size, event.old_size)
    }

    /// Record an event given as a raw kind code
    ///
    /// An unknown code is rejected before anything is touched.
    pub fn record_raw(
        &mut self,
        code: u32,
        new_size: u64,
        old_size: u64,
    ) -> Result<(), LedgerError> {
        if !self.is_initialized() {
            return Err(LedgerError::NotInitialized);
        }
        let kind = EventKind::from_code(code)?;
        self.record_event(kind, new_size, old_size)
    }

    /// Read the current totals
    pub fn report(&self) -> Result<Snapshot, LedgerError> {
        self.counters
            .as_ref()
            .map(Counters::snapshot)
            .ok_or(LedgerError::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_rejects_everything() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.record_event(EventKind::Allocate, 8, 0),
            Err(LedgerError::NotInitialized)
        );
        assert_eq!(ledger.record_raw(99, 8, 0), Err(LedgerError::NotInitialized));
        assert_eq!(ledger.report(), Err(LedgerError::NotInitialized));
        assert!(!ledger.is_initialized());
    }

    #[test]
    fn test_zeroed_allocate_accounts_like_allocate() {
        let mut plain = Ledger::active();
        let mut zeroed = Ledger::active();
        plain.record_event(EventKind::Allocate, 64, 0).unwrap();
        zeroed.record_event(EventKind::AllocateZeroed, 64, 0).unwrap();
        assert_eq!(plain.report().unwrap(), zeroed.report().unwrap());
    }

    #[test]
    fn test_allocate_ignores_old_size() {
        let mut ledger = Ledger::active();
        ledger.record_event(EventKind::Allocate, 10, 500).unwrap();
        assert_eq!(ledger.report().unwrap().current_live, 10);
    }

    #[test]
    fn test_overfree_wraps_and_recovers() {
        let mut ledger = Ledger::active();
        ledger.record(HeapEvent::allocate(10)).unwrap();
        ledger.record(HeapEvent::free(30)).unwrap();

        let snap = ledger.report().unwrap();
        assert_eq!(snap.current_live_signed(), -20);

        ledger.record(HeapEvent::allocate(20)).unwrap();
        assert_eq!(ledger.report().unwrap().current_live, 0);
    }

    #[test]
    fn test_init_resets_active_session() {
        let mut ledger = Ledger::active();
        ledger.record(HeapEvent::allocate(4096)).unwrap();
        ledger.init();
        assert_eq!(ledger.report().unwrap(), Snapshot::default());
    }
}
