//! The authoritative address-range table of one family.

use super::filter::RangeFilter;
use super::locks::{RowGuard, RowLocks};
use super::table::Table;
use crate::error::{IpamError, Result};
use crate::models::{AddressRange, IpFamily, RangeId, RangeItem};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Range rows of family `F` plus their row locks.
///
/// Reads take only the table read lock. Writes to existing rows go through a
/// [`Transaction`], which holds exclusive row locks from load until commit.
#[derive(Debug)]
pub struct RangeStore<F: IpFamily> {
    table: RwLock<Table<AddressRange<F>>>,
    locks: Arc<RowLocks>,
}

impl<F: IpFamily> Default for RangeStore<F> {
    fn default() -> Self {
        RangeStore {
            table: RwLock::new(Table::default()),
            locks: RowLocks::new(),
        }
    }
}

impl<F: IpFamily> RangeStore<F> {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is validated before the table is touched and `Table::swap`
    // undoes itself on failure, so a poisoned table is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Table<AddressRange<F>>> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table<AddressRange<F>>> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, id: RangeId) -> Result<AddressRange<F>> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("{} range {id}", F::LABEL)))
    }

    /// The range containing `addr`.
    pub fn find_containing(&self, addr: F::Addr) -> Result<AddressRange<F>> {
        self.read()
            .find_containing(F::to_bits(addr))
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("no {} range contains {addr}", F::LABEL)))
    }

    /// All rows, ordered by start address.
    pub fn list(&self) -> Vec<AddressRange<F>> {
        self.read().iter().cloned().collect()
    }

    /// Matching rows, ordered by start address.
    pub fn filter(&self, filter: &RangeFilter<F>) -> Vec<AddressRange<F>> {
        self.read().iter().filter(|r| filter.matches(r)).cloned().collect()
    }

    /// Rows lying entirely within `[start, end]`.
    pub fn contained_in(&self, start: F::Addr, end: F::Addr) -> Vec<AddressRange<F>> {
        self.read()
            .contained_in(F::to_bits(start), F::to_bits(end))
            .cloned()
            .collect()
    }

    /// `Validation` error when `item` would overlap a row outside `exclude`.
    pub fn check_free(&self, item: &RangeItem<F>, exclude: &[RangeId]) -> Result<()> {
        self.read().check_free(item.start_bits(), item.end_bits(), exclude)
    }

    /// Insert a new row; its name is derived from the start network when blank.
    pub fn insert(&self, mut range: AddressRange<F>) -> Result<AddressRange<F>> {
        prepare(&mut range)?;
        self.write().insert(range.clone())?;
        Ok(range)
    }

    /// Lock `ids` and load their rows.
    ///
    /// The rows are locked together (see [`RowLocks::acquire`]), so the start
    /// addresses used to order them may go stale without risking a deadlock. Rows
    /// are re-read once locked. Fails with `TargetNotExist` when an id is unknown
    /// or the row vanished while waiting for its lock.
    pub fn lock(&self, ids: &[RangeId]) -> Result<Transaction<'_, F>> {
        let mut order = Vec::with_capacity(ids.len());
        {
            let table = self.read();
            for id in ids {
                let row = table
                    .get(id)
                    .ok_or_else(|| IpamError::not_found(format!("{} range {id}", F::LABEL)))?;
                order.push((row.start, *id));
            }
        }
        order.sort();
        order.dedup();
        let ordered: Vec<RangeId> = order.into_iter().map(|(_, id)| id).collect();

        let guard = self.locks.acquire(&ordered);
        let mut rows = Vec::with_capacity(ordered.len());
        {
            let table = self.read();
            for id in &ordered {
                let row = table.get(id).ok_or_else(|| {
                    IpamError::not_found(format!("{} range {id} was removed concurrently", F::LABEL))
                })?;
                rows.push(row.clone());
            }
        }
        rows.sort_by_key(|r| r.start);
        Ok(Transaction {
            store: self,
            rows,
            guard,
        })
    }
}

/// Validate the stored invariants of a row and fill in the derived name.
fn prepare<F: IpFamily>(range: &mut AddressRange<F>) -> Result<()> {
    range
        .check_shape()
        .map_err(|e| IpamError::validation(e.message()))?;
    range.name = range.name.trim().to_string();
    range.derive_name_if_blank();
    Ok(())
}

/// Locked rows of one operation. Dropping it without committing releases the
/// locks and changes nothing.
#[derive(Debug)]
pub struct Transaction<'a, F: IpFamily> {
    store: &'a RangeStore<F>,
    rows: Vec<AddressRange<F>>,
    guard: RowGuard,
}

impl<'a, F: IpFamily> Transaction<'a, F> {
    /// Locked rows, ordered by start address.
    pub fn rows(&self) -> &[AddressRange<F>] {
        &self.rows
    }

    pub fn row(&self, id: RangeId) -> Option<&AddressRange<F>> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Remove `remove` and insert `insert` as one unit.
    ///
    /// Only locked rows may be removed. To update a row in place, remove its id
    /// and insert the new version with the same id. Overlap is re-checked with
    /// the removed rows excluded.
    pub fn commit(self, remove: &[RangeId], mut insert: Vec<AddressRange<F>>) -> Result<Vec<AddressRange<F>>> {
        if let Some(id) = remove.iter().find(|id| !self.guard.ids().contains(id)) {
            return Err(IpamError::conflict(format!("{} range {id} is not locked", F::LABEL)));
        }
        for range in insert.iter_mut() {
            prepare(range)?;
        }
        self.store.write().swap(remove, insert.clone())?;
        Ok(insert)
    }
}
