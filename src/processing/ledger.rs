//! Audit trail of range mutations.
//!
//! Records are appended after the mutation has committed. A ledger failure is
//! logged and swallowed: it never rolls back or fails the operation.

use crate::error::LedgerError;
use crate::models::{IpFamily, RangeRecord, RecordEvent, RecordType, UserRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Append-only sink for [`RangeRecord`]s.
pub trait RecordLedger<F: IpFamily>: Send + Sync {
    fn append(&self, record: RangeRecord<F>) -> Result<(), LedgerError>;
}

/// Build and append one record, logging instead of failing.
pub(crate) fn write_record<F: IpFamily>(
    ledger: &dyn RecordLedger<F>,
    event: RecordEvent<F>,
    user: Option<&UserRef>,
) {
    let record = RangeRecord::new(event, user.cloned());
    let shown = record.to_string();
    match ledger.append(record) {
        Ok(()) => log::debug!("Recorded {} {shown}", F::LABEL),
        Err(e) => log::warn!("Dropped {} ledger record '{shown}': {e}", F::LABEL),
    }
}

/// Criteria for [`MemoryLedger::query`]. Unset fields match everything.
#[derive(Debug, Clone)]
pub struct RecordQuery<F: IpFamily> {
    pub record_type: Option<RecordType>,
    /// Address that must fall inside the record's primary bounds.
    pub contains: Option<F::Addr>,
}

impl<F: IpFamily> Default for RecordQuery<F> {
    fn default() -> Self {
        RecordQuery {
            record_type: None,
            contains: None,
        }
    }
}

/// Ledger kept in memory, oldest record first.
#[derive(Debug)]
pub struct MemoryLedger<F: IpFamily> {
    records: RwLock<Vec<RangeRecord<F>>>,
    closed: AtomicBool,
}

impl<F: IpFamily> Default for MemoryLedger<F> {
    fn default() -> Self {
        MemoryLedger {
            records: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl<F: IpFamily> MemoryLedger<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<RangeRecord<F>>) -> Self {
        MemoryLedger {
            records: RwLock::new(records),
            closed: AtomicBool::new(false),
        }
    }

    /// Stop accepting records; every later append fails with `Unavailable`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<RangeRecord<F>> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Matching records, newest first.
    pub fn query(&self, query: &RecordQuery<F>) -> Vec<RangeRecord<F>> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .filter(|r| query.record_type.map_or(true, |t| r.record_type() == t))
            .filter(|r| query.contains.map_or(true, |addr| r.touches(addr)))
            .cloned()
            .collect()
    }

    /// Clear `user` from every record attributed to them. Returns how many changed.
    pub fn forget_user(&self, user: &UserRef) -> usize {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut count = 0;
        for record in records.iter_mut().filter(|r| r.user.as_ref() == Some(user)) {
            record.user = None;
            count += 1;
        }
        count
    }
}

impl<F: IpFamily> RecordLedger<F> for MemoryLedger<F> {
    fn append(&self, record: RangeRecord<F>) -> Result<(), LedgerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable(format!("{} ledger is closed", F::LABEL)));
        }
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}
