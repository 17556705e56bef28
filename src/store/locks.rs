//! Exclusive per-row locks.
//!
//! The equivalent of `SELECT ... FOR UPDATE` over the in-memory tables. A caller
//! names every row it will read-then-write; the locks are taken together once none
//! of them is held and released together when the [`RowGuard`] drops. A caller never
//! holds some rows while waiting for others, so two callers naming the same rows in
//! different orders cannot deadlock, even when an order was computed from start
//! addresses that moved before the locks were taken.

use crate::models::RangeId;
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct RowLocks {
    held: Mutex<HashSet<RangeId>>,
    released: Condvar,
}

impl RowLocks {
    pub fn new() -> Arc<RowLocks> {
        Arc::new(RowLocks::default())
    }

    fn held(&self) -> MutexGuard<'_, HashSet<RangeId>> {
        // the set is only ever inserted into or removed from, so a poisoned one is still whole
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until every id is free, then lock them all at once. Duplicates are ignored.
    pub fn acquire(self: &Arc<Self>, ids: &[RangeId]) -> RowGuard {
        let mut wanted: Vec<RangeId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !wanted.contains(id) {
                wanted.push(*id);
            }
        }

        let mut held = self.held();
        while wanted.iter().any(|id| held.contains(id)) {
            held = self.released.wait(held).unwrap_or_else(|e| e.into_inner());
        }
        held.extend(wanted.iter().copied());
        drop(held);

        RowGuard {
            locks: Arc::clone(self),
            ids: wanted,
        }
    }

    pub fn is_locked(&self, id: &RangeId) -> bool {
        self.held().contains(id)
    }
}

/// Rows locked by one operation.
#[derive(Debug)]
pub struct RowGuard {
    locks: Arc<RowLocks>,
    ids: Vec<RangeId>,
}

impl RowGuard {
    pub fn ids(&self) -> &[RangeId] {
        &self.ids
    }
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        let mut held = self.locks.held();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
