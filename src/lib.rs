//! # Heap need accounting
//!
//! Answers "how much heap did this workload need at once, and on average?"
//! by sampling the live heap size at every state change.
//!
//! ## Model
//!
//! Every allocate, free or resize is one event. After applying an event's
//! size delta to the live byte count, the ledger:
//!
//! 1. **Counts** the event
//! 2. **Accumulates** the live byte count (area under the live-bytes curve)
//! 3. **Averages**: `average = cumulative / count`
//! 4. **Tracks the peak**: `max = max(max, live)`
//!
//! No per-allocation state is kept, so each event costs O(1) time and the
//! ledger never allocates.
//!
//! ## Usage Example
//!
//! ```
//! use heapledger::{EventKind, Ledger};
//!
//! let mut ledger = Ledger::new();
//! ledger.init();
//! ledger.record_event(EventKind::Allocate, 100, 0)?;
//! ledger.record_event(EventKind::Allocate, 50, 0)?;
//! ledger.record_event(EventKind::Free, 150, 0)?;
//!
//! let snapshot = ledger.report()?;
//! assert_eq!(snapshot.max_live, 150);
//! assert_eq!(snapshot.average_live, 83);
//! # Ok::<(), heapledger::LedgerError>(())
//! ```
//!
//! To account for a whole process, install [`AccountingAllocator`] as the
//! global allocator; see [`shim`].

#![warn(missing_docs, missing_debug_implementations)]

pub mod event;    // Event kinds and trace lines
pub mod ledger;   // Accounting state machine
pub mod replay;   // Trace replay
pub mod shim;     // Global allocator adapter

// Re-exports for convenience
pub use event::{EventKind, HeapEvent};
pub use ledger::{Ledger, SharedLedger, Snapshot};
pub use replay::{ReplayConfig, ReplayError, ReplayOutcome, Replayer, Timeline};
pub use shim::AccountingAllocator;

use thiserror::Error;

/// Errors reported by the ledger
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// Raw event code outside the defined kinds; nothing was recorded
    #[error("invalid event kind {0}")]
    InvalidEventKind(u32),

    /// `record_event` or `report` called before `init`
    #[error("ledger used before init")]
    NotInitialized,
}
