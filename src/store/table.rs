//! In-memory interval table.
//!
//! Rows are kept by id and indexed by start address. Because rows never overlap,
//! start addresses are unique and a single ordered index answers both the
//! overlap check and the containment lookup.

use crate::error::{IpamError, Result};
use crate::models::{AddressRange, ExternalRange, IpFamily, RangeId, Supernet, V4};
use std::collections::{BTreeMap, HashMap};

/// A table row with a unique id and an inclusive `[start, end]` span.
pub trait Row: Clone {
    fn row_id(&self) -> RangeId;

    /// Bounds as integers.
    fn span(&self) -> (u128, u128);
}

impl<F: IpFamily> Row for AddressRange<F> {
    fn row_id(&self) -> RangeId {
        self.id
    }

    fn span(&self) -> (u128, u128) {
        (self.start_bits(), self.end_bits())
    }
}

impl Row for Supernet {
    fn row_id(&self) -> RangeId {
        self.id
    }

    fn span(&self) -> (u128, u128) {
        (V4::to_bits(self.start), V4::to_bits(self.end))
    }
}

impl Row for ExternalRange {
    fn row_id(&self) -> RangeId {
        self.id
    }

    fn span(&self) -> (u128, u128) {
        (V4::to_bits(self.start), V4::to_bits(self.end))
    }
}

#[derive(Debug, Clone)]
pub struct Table<R: Row> {
    rows: HashMap<RangeId, R>,
    by_start: BTreeMap<u128, RangeId>,
}

impl<R: Row> Default for Table<R> {
    fn default() -> Self {
        Table {
            rows: HashMap::new(),
            by_start: BTreeMap::new(),
        }
    }
}

impl<R: Row> Table<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &RangeId) -> Option<&R> {
        self.rows.get(id)
    }

    /// Rows ordered by start address.
    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        self.by_start.values().filter_map(|id| self.rows.get(id))
    }

    /// First row overlapping `[start, end]`, ignoring the ids in `exclude`.
    ///
    /// Two spans overlap unless one ends before the other starts.
    pub fn find_overlap(&self, start: u128, end: u128, exclude: &[RangeId]) -> Option<&R> {
        for (_, id) in self.by_start.range(..=end).rev() {
            if exclude.contains(id) {
                continue;
            }
            let row = self.rows.get(id)?;
            if row.span().1 >= start {
                return Some(row);
            }
            // rows are disjoint, so nothing earlier can reach `start` either
            break;
        }
        None
    }

    /// The row whose span contains `bits`.
    pub fn find_containing(&self, bits: u128) -> Option<&R> {
        let (_, id) = self.by_start.range(..=bits).next_back()?;
        self.rows.get(id).filter(|row| row.span().1 >= bits)
    }

    /// Rows lying entirely within `[start, end]`, ordered by start.
    pub fn contained_in(&self, start: u128, end: u128) -> impl Iterator<Item = &R> + '_ {
        self.by_start
            .range(start..=end)
            .filter_map(|(_, id)| self.rows.get(id))
            .filter(move |row| row.span().1 <= end)
    }

    /// Insert a new row. Fails with `Validation` on a duplicate id or an overlap.
    pub fn insert(&mut self, row: R) -> Result<()> {
        let id = row.row_id();
        if self.rows.contains_key(&id) {
            return Err(IpamError::validation(format!("row {id} already exists")));
        }
        let (start, end) = row.span();
        self.check_free(start, end, &[])?;
        self.by_start.insert(start, id);
        self.rows.insert(id, row);
        Ok(())
    }

    /// Replace the row with the same id, which may move into its own old space.
    pub fn replace(&mut self, row: R) -> Result<R> {
        let id = row.row_id();
        let (start, end) = row.span();
        self.check_free(start, end, &[id])?;
        let old = self
            .remove(&id)
            .ok_or_else(|| IpamError::not_found(format!("row {id}")))?;
        self.by_start.insert(start, id);
        self.rows.insert(id, row);
        Ok(old)
    }

    pub fn remove(&mut self, id: &RangeId) -> Option<R> {
        let row = self.rows.remove(id)?;
        self.by_start.remove(&row.span().0);
        Some(row)
    }

    /// `Validation` error when `[start, end]` overlaps a row outside `exclude`.
    pub fn check_free(&self, start: u128, end: u128, exclude: &[RangeId]) -> Result<()> {
        match self.find_overlap(start, end, exclude) {
            Some(existing) => {
                let (s, e) = existing.span();
                log::debug!("span {start:#x}-{end:#x} overlaps row {} ({s:#x}-{e:#x})", existing.row_id());
                Err(IpamError::validation(format!(
                    "address range overlaps existing row {}",
                    existing.row_id()
                )))
            }
            None => Ok(()),
        }
    }

    /// Remove `remove`, then insert `insert`, all or nothing.
    pub fn swap(&mut self, remove: &[RangeId], insert: Vec<R>) -> Result<()> {
        let mut removed = Vec::with_capacity(remove.len());
        for id in remove {
            match self.remove(id) {
                Some(row) => removed.push(row),
                None => {
                    self.restore(Vec::new(), removed);
                    return Err(IpamError::not_found(format!("row {id}")));
                }
            }
        }

        let mut inserted = Vec::with_capacity(insert.len());
        for row in insert {
            let id = row.row_id();
            if let Err(e) = self.insert(row) {
                self.restore(inserted, removed);
                return Err(e);
            }
            inserted.push(id);
        }
        Ok(())
    }

    fn restore(&mut self, inserted: Vec<RangeId>, removed: Vec<R>) {
        for id in inserted {
            self.remove(&id);
        }
        for row in removed {
            let (start, id) = (row.span().0, row.row_id());
            self.by_start.insert(start, id);
            self.rows.insert(id, row);
        }
    }
}
