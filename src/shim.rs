//! Global allocator shim
//!
//! Wraps any [`GlobalAlloc`] and reports every successful call to a
//! [`SharedLedger`]:
//!
//! | call           | event                                  |
//! |----------------|----------------------------------------|
//! | `alloc`        | `Allocate(layout.size())`              |
//! | `alloc_zeroed` | `AllocateZeroed(layout.size())`        |
//! | `dealloc`      | `Free(layout.size())`                  |
//! | `realloc`      | `Resize(new_size, layout.size())`      |
//!
//! Events before `init` are dropped, but a later `dealloc` of memory
//! allocated before `init` is still recorded as `Free`. If that happens
//! during a session, live bytes go negative, which the ledger stores as a
//! wrapped value near 2^64, and `max_live` is taken from that wrapped
//! value. Call `init` before the workload allocates anything it will free,
//! or measure against a baseline with [`Snapshot::current_live_signed`].
//!
//! [`Snapshot::current_live_signed`]: crate::Snapshot::current_live_signed
//!
//! ```ignore
//! use std::alloc::System;
//! use heapledger::{AccountingAllocator, SharedLedger};
//!
//! static LEDGER: SharedLedger = SharedLedger::new();
//!
//! #[global_allocator]
//! static GLOBAL: AccountingAllocator<System> = AccountingAllocator::new(System, &LEDGER);
//!
//! fn main() {
//!     LEDGER.init();
//!     // ... workload ...
//!     println!("{}", LEDGER.report().unwrap());
//! }
//! ```

use std::alloc::{GlobalAlloc, Layout};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::EventKind;
use crate::ledger::SharedLedger;

/// Allocator adapter that feeds a [`SharedLedger`]
#[derive(Debug)]
pub struct AccountingAllocator<A> {
    inner: A,
    ledger: &'static SharedLedger,
    enabled: AtomicBool,
}

impl<A> AccountingAllocator<A> {
    /// Wrap `inner`, reporting into `ledger`
    pub const fn new(inner: A, ledger: &'static SharedLedger) -> Self {
        Self {
            inner,
            ledger,
            enabled: AtomicBool::new(true),
        }
    }

    /// Stop recording events until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Start recording events again
    pub fn resume(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Whether events are currently recorded
    pub fn is_recording(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    // Runs inside the allocator: must not allocate or log. Events before
    // `init` are dropped.
    fn note(&self, kind: EventKind, new_size: usize, old_size: usize) {
        if self.is_recording() {
            let _ = self
                .ledger
                .record_event(kind, new_size as u64, old_size as u64);
        }
    }
}

// SAFETY: every call is delegated unchanged to `inner`, which upholds the
// `GlobalAlloc` contract. Accounting only reads `layout`/`new_size` and never
// allocates.
unsafe impl<A: GlobalAlloc> GlobalAlloc for AccountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller guarantees a non-zero-sized layout.
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            self.note(EventKind::Allocate, layout.size(), 0);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller guarantees a non-zero-sized layout.
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.note(EventKind::AllocateZeroed, layout.size(), 0);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: ptr was returned by this allocator with the same layout.
        unsafe { self.inner.dealloc(ptr, layout) };
        self.note(EventKind::Free, layout.size(), 0);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: ptr/layout come from this allocator; new_size is checked by
        // the caller.
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            self.note(EventKind::Resize, new_size, layout.size());
        }
        new_ptr
    }
}
