//! Lock-protected ledger for multi-threaded hosts

use std::sync::{Mutex, MutexGuard};

use super::{Ledger, Snapshot};
use crate::event::EventKind;
use crate::LedgerError;

/// A [`Ledger`] behind one mutex
///
/// Every operation holds the lock for its whole duration, so a snapshot is
/// always taken from one consistent state. Nothing runs under the lock that
/// could allocate: an allocator shim recording into this ledger must never
/// re-enter it.
#[derive(Debug, Default)]
pub struct SharedLedger {
    inner: Mutex<Ledger>,
}

impl SharedLedger {
    /// Create an uninitialized shared ledger; usable in a `static`
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Ledger::new()),
        }
    }

    // The ledger holds plain integers and each update completes before the
    // guard drops, so a poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reset and open a new session
    pub fn init(&self) {
        self.lock().init();
        tracing::debug!("heap ledger session opened");
    }

    /// Record one heap event
    pub fn record_event(
        &self,
        kind: EventKind,
        new_size: u64,
        old_size: u64,
    ) -> Result<(), LedgerError> {
        self.lock().record_event(kind, new_size, old_size)
    }

    /// Record an event given as a raw kind code
    pub fn record_raw(&self, code: u32, new_size: u64, old_size: u64) -> Result<(), LedgerError> {
        self.lock().record_raw(code, new_size, old_size)
    }

    /// Consistent snapshot of all totals
    pub fn report(&self) -> Result<Snapshot, LedgerError> {
        self.lock().report()
    }

    /// Run `f` against the ledger with the lock held
    ///
    /// `f` must not allocate if this ledger is fed by an allocator shim.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&*self.lock())
    }
}
