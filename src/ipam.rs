//! The whole engine: both range families plus their side tables.

use crate::config::Limits;
use crate::error::{IpamError, SnapshotError};
use crate::models::{AddressRange, RangeId, Supernet, UserRef, V4, V6};
use crate::processing::{MemoryLedger, RangeManager, SupernetWarehouse};
use crate::store::snapshot::{read_snapshot, write_snapshot};
use crate::store::{AddressNotes, AsnRegistry, ExternalRangeStore, IpamSnapshot, RangeStore};
use std::path::Path;
use std::sync::Arc;

/// IPv4 and IPv6 range managers wired to their ledgers, with the IPv4
/// supernet warehouse observing the IPv4 store.
pub struct Ipam {
    pub v4: RangeManager<V4>,
    pub v6: RangeManager<V6>,
    pub supernets: Arc<SupernetWarehouse>,
    pub external: ExternalRangeStore,
    pub v4_notes: AddressNotes<V4>,
    pub v6_notes: AddressNotes<V6>,
    pub asns: AsnRegistry,
    pub v4_ledger: Arc<MemoryLedger<V4>>,
    pub v6_ledger: Arc<MemoryLedger<V6>>,
}

impl Ipam {
    pub fn new(limits: Limits) -> Self {
        Self::with_ledgers(limits, MemoryLedger::new(), MemoryLedger::new())
    }

    fn with_ledgers(limits: Limits, v4_ledger: MemoryLedger<V4>, v6_ledger: MemoryLedger<V6>) -> Self {
        let v4_store = Arc::new(RangeStore::new());
        let supernets = Arc::new(SupernetWarehouse::new(v4_store.clone()));
        let v4_ledger = Arc::new(v4_ledger);
        let v6_ledger = Arc::new(v6_ledger);
        Ipam {
            v4: RangeManager::new(v4_store, v4_ledger.clone(), limits).with_observer(supernets.clone()),
            v6: RangeManager::new(Arc::new(RangeStore::new()), v6_ledger.clone(), limits),
            supernets,
            external: ExternalRangeStore::new(),
            v4_notes: AddressNotes::new(),
            v6_notes: AddressNotes::new(),
            asns: AsnRegistry::new(),
            v4_ledger,
            v6_ledger,
        }
    }

    /// Stock an out-of-warehouse supernet with a Wait range under the supernet's AS.
    pub fn put_in_warehouse(&self, id: RangeId, user: Option<&UserRef>) -> Result<(Supernet, AddressRange<V4>), IpamError> {
        let supernet = self.supernets.get(id)?;
        let asn = self.asns.get_or_create(supernet.asn);
        self.supernets.put_in_warehouse(id, &self.v4, asn, user)
    }

    /// Detach `user` from every ledger record. Returns how many records changed.
    pub fn forget_user(&self, user: &UserRef) -> usize {
        let count = self.v4_ledger.forget_user(user) + self.v6_ledger.forget_user(user);
        log::info!("Detached user {} from {count} records", user.0);
        count
    }

    pub fn snapshot(&self) -> IpamSnapshot {
        IpamSnapshot {
            asns: self.asns.entries(),
            ipv4_ranges: self.v4.store().list(),
            ipv6_ranges: self.v6.store().list(),
            supernets: self.supernets.list(),
            external_ranges: self.external.filter(&Default::default()),
            ipv4_notes: self.v4_notes.entries(),
            ipv6_notes: self.v6_notes.entries(),
            ipv4_records: self.v4_ledger.records(),
            ipv6_records: self.v6_ledger.records(),
        }
    }

    /// Rebuild an engine from a snapshot. Every row passes the normal shape and
    /// overlap checks; supernet status is re-derived from the restored ranges.
    pub fn restore(snapshot: IpamSnapshot, limits: Limits) -> Result<Ipam, SnapshotError> {
        let mut ipam = Self::with_ledgers(
            limits,
            MemoryLedger::from_records(snapshot.ipv4_records),
            MemoryLedger::from_records(snapshot.ipv6_records),
        );
        ipam.asns = AsnRegistry::from_entries(snapshot.asns);
        ipam.v4_notes = AddressNotes::from_entries(snapshot.ipv4_notes);
        ipam.v6_notes = AddressNotes::from_entries(snapshot.ipv6_notes);

        for range in snapshot.ipv4_ranges {
            ipam.v4.store().insert(range)?;
        }
        for range in snapshot.ipv6_ranges {
            ipam.v6.store().insert(range)?;
        }
        for supernet in snapshot.supernets {
            ipam.supernets.restore(supernet)?;
        }
        for external in snapshot.external_ranges {
            ipam.external.restore(external)?;
        }
        log::info!(
            "Restored {} ipv4 ranges, {} ipv6 ranges, {} supernets",
            ipam.v4.store().len(),
            ipam.v6.store().len(),
            ipam.supernets.list().len()
        );
        Ok(ipam)
    }

    pub fn load(path: &Path, limits: Limits) -> Result<Ipam, SnapshotError> {
        Self::restore(read_snapshot(path)?, limits)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        write_snapshot(path, &self.snapshot())
    }
}

impl Default for Ipam {
    fn default() -> Self {
        Ipam::new(Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrgRef, RangeItem, SupernetStatus};
    use crate::processing::{NewRange, SupernetInput};

    #[test]
    fn test_put_in_warehouse_uses_registry() {
        let ipam = Ipam::default();
        let sn = ipam
            .supernets
            .create(
                SupernetInput {
                    start: Some("10.8.0.0".parse().unwrap()),
                    end: Some("10.8.255.255".parse().unwrap()),
                    prefix: 16,
                    asn: 4134,
                    remark: String::new(),
                },
                "admin",
            )
            .unwrap();
        let (sn, range) = ipam.put_in_warehouse(sn.id, None).unwrap();
        assert_eq!(sn.status, SupernetStatus::InWarehouse);
        assert_eq!(range.asn.number, 4134);
        assert_eq!(ipam.asns.get(4134).unwrap().name, "AS4134");
        assert_eq!(ipam.v4_ledger.len(), 1);
    }

    #[test]
    fn test_restore_rejects_overlap() {
        let ipam = Ipam::default();
        let asn = ipam.asns.get_or_create(7497);
        let item = RangeItem::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        ipam.v4.create(NewRange::new(item, asn), None).unwrap();

        let mut snapshot = ipam.snapshot();
        let mut copy = snapshot.ipv4_ranges[0].clone();
        copy.id = RangeId::new();
        snapshot.ipv4_ranges.push(copy);
        let err = Ipam::restore(snapshot, Limits::default()).err().unwrap();
        assert!(matches!(err, SnapshotError::Restore(IpamError::Validation(_))));
    }

    #[test]
    fn test_forget_user() {
        let ipam = Ipam::default();
        let asn = ipam.asns.get_or_create(7497);
        let user = UserRef("lisi".into());
        let item = RangeItem::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let range = ipam.v4.create(NewRange::new(item, asn), Some(&user)).unwrap();
        ipam.v4.assign(range.id, OrgRef::new("vo1", "org1"), Some(&user)).unwrap();
        assert_eq!(ipam.forget_user(&user), 2);
        assert!(ipam.v4_ledger.records().iter().all(|r| r.user.is_none()));
    }
}
