//! Merging adjacent ranges into one coarser range.

use super::manager::RangeManager;
use crate::error::{IpamError, Result};
use crate::math;
use crate::models::{AddressRange, IpFamily, RangeId, RangeStatus, RecordEvent, UserRef};
use chrono::Utc;
use itertools::Itertools;

impl<F: IpFamily> RangeManager<F> {
    /// Replace `ids` with a single range at `new_prefix`.
    ///
    /// Members must share status (Wait or Reserved), AS and, when Reserved, the
    /// organization; they must be contiguous and fall in one `new_prefix`
    /// network. A single member already at `new_prefix` is returned unchanged.
    /// With `dry_run` the merged range is validated and returned with a nil id,
    /// nothing is locked or written.
    pub fn merge(
        &self,
        ids: &[RangeId],
        new_prefix: u8,
        dry_run: bool,
        user: Option<&UserRef>,
    ) -> Result<AddressRange<F>> {
        let ids: Vec<RangeId> = ids.iter().copied().unique().collect();
        if ids.is_empty() {
            return Err(IpamError::validation("no ranges to merge"));
        }
        if ids.len() > self.limits.merge_members {
            return Err(IpamError::invalid(format!(
                "cannot merge {} ranges, at most {} allowed",
                ids.len(),
                self.limits.merge_members
            )));
        }
        if !(1..=F::WIDTH).contains(&new_prefix) {
            return Err(IpamError::validation(format!(
                "merge prefix /{new_prefix} is outside 1-{}",
                F::WIDTH
            )));
        }

        if dry_run {
            let mut members = ids
                .iter()
                .map(|id| self.store.get(*id).map_err(missing_member))
                .collect::<Result<Vec<_>>>()?;
            check_members(&mut members, new_prefix)?;
            if let Some(unchanged) = single_at_prefix(&members, new_prefix) {
                return Ok(unchanged);
            }
            let mut merged = merged_range(&members, new_prefix);
            merged.id = RangeId::nil();
            self.store.check_free(&merged.item(), &ids)?;
            return Ok(merged);
        }

        let tx = self.store.lock(&ids).map_err(missing_member)?;
        let mut members = tx.rows().to_vec();
        check_members(&mut members, new_prefix)?;
        if let Some(unchanged) = single_at_prefix(&members, new_prefix) {
            log::debug!("{unchanged} is already /{new_prefix}, nothing to merge");
            return Ok(unchanged);
        }

        let merged = merged_range(&members, new_prefix);
        let mut inserted = tx.commit(&ids, vec![merged])?;
        let merged = inserted.remove(0);
        log::info!("Merged {} {} ranges into {merged}", members.len(), F::LABEL);

        self.record(
            RecordEvent::Merge {
                merged: merged.item(),
                members: members.iter().map(|m| m.item()).collect(),
            },
            user,
        );
        self.notify(&[merged.item()]);
        Ok(merged)
    }
}

fn missing_member(e: IpamError) -> IpamError {
    match e {
        IpamError::TargetNotExist(msg) => IpamError::validation(format!("merge member missing: {msg}")),
        other => other,
    }
}

/// Sort members by start and check they can form one range at `new_prefix`.
fn check_members<F: IpFamily>(members: &mut [AddressRange<F>], new_prefix: u8) -> Result<()> {
    members.sort_by_key(|m| m.start_bits());
    for member in members.iter() {
        if !member.status.is_mutable() {
            return Err(IpamError::validation(format!(
                "only wait or reserved ranges can be merged, {member} is {}",
                member.status
            )));
        }
        if new_prefix > member.prefix {
            return Err(IpamError::validation(format!(
                "merge prefix /{new_prefix} is longer than /{} of {member}",
                member.prefix
            )));
        }
    }

    for (a, b) in members.iter().tuple_windows() {
        if a.status != b.status {
            return Err(IpamError::validation(format!(
                "status differs: {a} is {}, {b} is {}",
                a.status, b.status
            )));
        }
        if a.asn.number != b.asn.number {
            return Err(IpamError::validation(format!(
                "AS differs: {a} is AS{}, {b} is AS{}",
                a.asn.number, b.asn.number
            )));
        }
        if a.status == RangeStatus::Reserved && a.org != b.org {
            return Err(IpamError::validation(format!(
                "reserved ranges {a} and {b} belong to different organizations"
            )));
        }
        if !math::contiguous::<F>(a.end, b.start) {
            return Err(IpamError::validation(format!("ranges are not contiguous: {a}; {b}")));
        }
        if !math::same_network::<F>(a.start, b.start, new_prefix)? {
            return Err(IpamError::validation(format!(
                "{a} and {b} are not in the same /{new_prefix} network"
            )));
        }
    }
    Ok(())
}

fn single_at_prefix<F: IpFamily>(members: &[AddressRange<F>], new_prefix: u8) -> Option<AddressRange<F>> {
    match members {
        [only] if only.prefix == new_prefix => Some(only.clone()),
        _ => None,
    }
}

/// New range over all members, inheriting AS, status and (when Reserved) org from the first.
fn merged_range<F: IpFamily>(members: &[AddressRange<F>], new_prefix: u8) -> AddressRange<F> {
    let first = &members[0];
    let last = &members[members.len() - 1];
    let mut item = first.item();
    item.end = last.end;
    item.prefix = new_prefix;

    let mut merged = AddressRange::build("", item, first.asn.clone(), Utc::now());
    merged.status = first.status;
    if first.status == RangeStatus::Reserved {
        merged.org = first.org.clone();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::models::{OrgRef, RangeItem, RecordType, V4};
    use crate::processing::manager::test_support::{asn, manager, seed};

    fn ids(ranges: &[AddressRange<V4>]) -> Vec<RangeId> {
        ranges.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_merge_undoes_split() {
        let (manager, ledger) = manager::<V4>();
        let source = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Reserved);
        let subnets = manager.split_by_prefix(source.id, 26, false, None).unwrap();

        let merged = manager.merge(&ids(&subnets), 24, false, None).unwrap();
        assert_eq!(merged.item(), source.item());
        assert_eq!((merged.status, &merged.asn, &merged.org), (source.status, &source.asn, &source.org));
        assert_ne!(merged.id, source.id);
        assert_eq!(merged.name, "10.0.0.0/24");
        assert_eq!(manager.store().len(), 1);

        let records = ledger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].record_type(), RecordType::Merge);
        assert_eq!(records[1].event.primary(), &source.item());
        assert_eq!(records[1].event.secondary().len(), 4);
    }

    #[test]
    fn test_merge_member_order_does_not_matter() {
        let (manager, _) = manager::<V4>();
        let b = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Wait);
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 25, RangeStatus::Wait);
        let merged = manager.merge(&[b.id, a.id, b.id], 24, false, None).unwrap();
        assert_eq!(merged.item().to_string(), "10.0.0.0-10.0.0.255 /24");
        assert!(merged.org.is_none());
    }

    #[test]
    fn test_merge_gap_is_rejected() {
        let (manager, ledger) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.126", 25, RangeStatus::Wait);
        let b = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Wait);
        let err = manager.merge(&[a.id, b.id], 24, false, None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!(err.message().contains("not contiguous"));
        assert_eq!(manager.store().len(), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_merge_mismatches() {
        let (manager, _) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 25, RangeStatus::Wait);
        let b = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Reserved);
        assert_eq!(manager.merge(&[a.id, b.id], 24, false, None).unwrap_err().code(), "ValidationError");

        let mut other_as = AddressRange::build("", RangeItem::parse("10.0.1.0", "10.0.1.127", 25).unwrap(), asn(4134), Utc::now());
        other_as = manager.store().insert(other_as).unwrap();
        let c = seed(&manager, "10.0.1.128", "10.0.1.255", 25, RangeStatus::Wait);
        let err = manager.merge(&[other_as.id, c.id], 24, false, None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!(err.message().contains("AS differs"));

        let d = seed(&manager, "10.0.2.0", "10.0.2.127", 25, RangeStatus::Reserved);
        let mut e = AddressRange::build("", RangeItem::parse("10.0.2.128", "10.0.2.255", 25).unwrap(), asn(7497), Utc::now());
        e.status = RangeStatus::Reserved;
        e.org = Some(OrgRef::new("vo2", "org2"));
        let e = manager.store().insert(e).unwrap();
        assert_eq!(manager.merge(&[d.id, e.id], 24, false, None).unwrap_err().code(), "ValidationError");
    }

    #[test]
    fn test_merge_across_networks_is_rejected() {
        let (manager, _) = manager::<V4>();
        let a = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Wait);
        let b = seed(&manager, "10.0.1.0", "10.0.1.127", 25, RangeStatus::Wait);
        let err = manager.merge(&[a.id, b.id], 24, false, None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!(manager.merge(&[a.id, b.id], 23, false, None).is_ok());
    }

    #[test]
    fn test_merge_assigned_is_rejected() {
        let (manager, _) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 25, RangeStatus::Assigned);
        let b = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Assigned);
        let err = manager.merge(&[a.id, b.id], 24, false, None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!(err.message().contains("assigned"));
        assert_eq!(manager.merge(&[a.id, b.id], 24, true, None).unwrap_err().code(), "ValidationError");
        assert_eq!(manager.store().len(), 2);
    }

    #[test]
    fn test_merge_argument_errors() {
        let (manager, _) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 25, RangeStatus::Wait);
        assert_eq!(manager.merge(&[], 24, false, None).unwrap_err().code(), "ValidationError");
        assert_eq!(manager.merge(&[], 24, true, None).unwrap_err().code(), "ValidationError");
        assert_eq!(manager.merge(&[a.id], 26, false, None).unwrap_err().code(), "ValidationError");
        assert_eq!(manager.merge(&[a.id], 33, false, None).unwrap_err().code(), "ValidationError");
        let err = manager.merge(&[a.id, RangeId::new()], 24, false, None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        let err = manager.merge(&[a.id, RangeId::new()], 24, true, None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
    }

    #[test]
    fn test_merge_member_limit() {
        let ledger = std::sync::Arc::new(crate::processing::MemoryLedger::<V4>::new());
        let limits = Limits {
            merge_members: 1,
            ..Limits::default()
        };
        let manager = RangeManager::new(std::sync::Arc::new(crate::store::RangeStore::new()), ledger, limits);
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 25, RangeStatus::Wait);
        let b = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Wait);
        assert_eq!(manager.merge(&[a.id, b.id], 24, false, None).unwrap_err().code(), "InvalidArgument");
    }

    #[test]
    fn test_merge_single_member_same_prefix_is_noop() {
        let (manager, ledger) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Wait);
        assert_eq!(manager.merge(&[a.id], 24, false, None).unwrap(), a);
        assert_eq!(manager.get(a.id).unwrap(), a);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_merge_single_member_widens_prefix() {
        let (manager, _) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Wait);
        let merged = manager.merge(&[a.id], 16, false, None).unwrap();
        assert_eq!(merged.prefix, 16);
        assert_eq!(merged.item().start, a.start);
        assert_eq!(merged.name, "10.0.0.0/16");
    }

    #[test]
    fn test_merge_dry_run() {
        let (manager, ledger) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 25, RangeStatus::Wait);
        let b = seed(&manager, "10.0.0.128", "10.0.0.255", 25, RangeStatus::Wait);
        let merged = manager.merge(&[a.id, b.id], 24, true, None).unwrap();
        assert!(merged.id.is_nil());
        assert_eq!(merged.item().to_string(), "10.0.0.0-10.0.0.255 /24");
        assert_eq!(manager.store().len(), 2);
        assert!(ledger.is_empty());
    }
}
