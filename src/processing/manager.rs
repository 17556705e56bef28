//! Entry point for range operations of one family.

use super::ledger::{write_record, RecordLedger};
use crate::config::Limits;
use crate::error::{IpamError, Result};
use crate::models::{AddressRange, IpFamily, RangeId, RangeItem, RecordEvent, UserRef};
use crate::store::{RangeFilter, RangeStore, Transaction};
use std::sync::Arc;

/// Told about committed changes that add or remove address space.
pub trait RangeObserver<F: IpFamily>: Send + Sync {
    /// `spans` are the bounds that appeared or disappeared.
    fn ranges_changed(&self, spans: &[RangeItem<F>]);
}

/// Lifecycle, split and merge operations over one [`RangeStore`].
///
/// Every mutation validates fully, commits through a store [`Transaction`](crate::store::Transaction),
/// then writes one ledger record and notifies observers.
pub struct RangeManager<F: IpFamily> {
    pub(super) store: Arc<RangeStore<F>>,
    ledger: Arc<dyn RecordLedger<F>>,
    observers: Vec<Arc<dyn RangeObserver<F>>>,
    pub(super) limits: Limits,
}

impl<F: IpFamily> RangeManager<F> {
    pub fn new(store: Arc<RangeStore<F>>, ledger: Arc<dyn RecordLedger<F>>, limits: Limits) -> Self {
        RangeManager {
            store,
            ledger,
            observers: Vec::new(),
            limits,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RangeObserver<F>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn store(&self) -> &Arc<RangeStore<F>> {
        &self.store
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn get(&self, id: RangeId) -> Result<AddressRange<F>> {
        self.store.get(id)
    }

    pub fn find_containing(&self, addr: F::Addr) -> Result<AddressRange<F>> {
        self.store.find_containing(addr)
    }

    pub fn filter(&self, filter: &RangeFilter<F>) -> Vec<AddressRange<F>> {
        self.store.filter(filter)
    }

    pub(crate) fn record(&self, event: RecordEvent<F>, user: Option<&UserRef>) {
        write_record(self.ledger.as_ref(), event, user);
    }

    pub(crate) fn notify(&self, spans: &[RangeItem<F>]) {
        for observer in &self.observers {
            observer.ranges_changed(spans);
        }
    }
}

/// `Conflict` unless the range is Wait or Reserved.
pub(super) fn require_mutable<F: IpFamily>(range: &AddressRange<F>, action: &str) -> Result<()> {
    if range.status.is_mutable() {
        Ok(())
    } else {
        Err(IpamError::conflict(format!(
            "only wait or reserved ranges can be {action}, {range} is {}",
            range.status
        )))
    }
}

pub(super) fn locked_row<F: IpFamily>(tx: &Transaction<'_, F>, id: RangeId) -> Result<AddressRange<F>> {
    tx.row(id)
        .cloned()
        .ok_or_else(|| IpamError::not_found(format!("{} range {id}", F::LABEL)))
}
