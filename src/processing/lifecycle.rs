//! Allocation state machine of a single range.
//!
//! ```text
//!          reserve            assign
//!   Wait ----------> Reserved --------> Assigned
//!     |  \_______________________________^  |
//!     |            assign                   |
//!     ^-------------- recover --------------'
//! ```
//!
//! Only Wait and Reserved ranges may be edited or deleted.

use super::manager::{locked_row, require_mutable, RangeManager};
use crate::error::{IpamError, Result};
use crate::models::{AddressRange, AsnRef, IpFamily, OrgRef, RangeId, RangeItem, RangeStatus, RecordEvent, UserRef};
use crate::store::Transaction;
use chrono::Utc;

/// Fields of a range to create.
#[derive(Debug, Clone)]
pub struct NewRange<F: IpFamily> {
    /// Derived from the start network when blank.
    pub name: String,
    pub item: RangeItem<F>,
    pub asn: AsnRef,
    pub admin_remark: String,
    pub user_remark: String,
}

impl<F: IpFamily> NewRange<F> {
    pub fn new(item: RangeItem<F>, asn: AsnRef) -> Self {
        NewRange {
            name: String::new(),
            item,
            asn,
            admin_remark: String::new(),
            user_remark: String::new(),
        }
    }
}

/// Direct edits to a range. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct RangeUpdate<F: IpFamily> {
    /// Ignored when blank.
    pub name: Option<String>,
    pub item: Option<RangeItem<F>>,
    pub asn: Option<AsnRef>,
    pub admin_remark: Option<String>,
}

impl<F: IpFamily> RangeManager<F> {
    /// Add a Wait range.
    pub fn create(&self, new: NewRange<F>, user: Option<&UserRef>) -> Result<AddressRange<F>> {
        let mut range = AddressRange::build(&new.name, new.item, new.asn, Utc::now());
        range.admin_remark = new.admin_remark;
        range.user_remark = new.user_remark;
        let range = self.store.insert(range)?;
        log::info!("Created {} range {range} '{}'", F::LABEL, range.name);

        self.record(RecordEvent::Add { range: range.item() }, user);
        self.notify(&[range.item()]);
        Ok(range)
    }

    /// Edit name, bounds, AS or admin remark. A `Change` record is written only
    /// when the bounds moved.
    pub fn update(&self, id: RangeId, update: RangeUpdate<F>, user: Option<&UserRef>) -> Result<AddressRange<F>> {
        let tx = self.store.lock(&[id])?;
        let old = locked_row(&tx, id)?;
        require_mutable(&old, "edited")?;

        let mut range = old.clone();
        if let Some(name) = update.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            range.name = name.to_string();
        }
        if let Some(item) = update.item {
            range.start = item.start;
            range.end = item.end;
            range.prefix = item.prefix;
        }
        if let Some(asn) = update.asn {
            range.asn = asn;
        }
        if let Some(admin_remark) = update.admin_remark {
            range.admin_remark = admin_remark;
        }
        if range == old {
            return Ok(old);
        }
        range.updated_at = Utc::now();

        let range = commit_one(tx, range)?;
        log::info!("Updated {} range {old} -> {range}", F::LABEL);
        if range.item() != old.item() {
            self.record(
                RecordEvent::Change {
                    old: old.item(),
                    new: range.item(),
                },
                user,
            );
            self.notify(&[old.item(), range.item()]);
        }
        Ok(range)
    }

    pub fn delete(&self, id: RangeId, user: Option<&UserRef>) -> Result<AddressRange<F>> {
        let tx = self.store.lock(&[id])?;
        let range = locked_row(&tx, id)?;
        require_mutable(&range, "deleted")?;
        tx.commit(&[id], Vec::new())?;
        log::info!("Deleted {} range {range}", F::LABEL);

        self.record(
            RecordEvent::Delete {
                range: range.item(),
                org: range.org.clone(),
            },
            user,
        );
        self.notify(&[range.item()]);
        Ok(range)
    }

    /// Wait -> Reserved for `org`.
    pub fn reserve(&self, id: RangeId, org: OrgRef, user: Option<&UserRef>) -> Result<AddressRange<F>> {
        let tx = self.store.lock(&[id])?;
        let old = locked_row(&tx, id)?;
        if old.status != RangeStatus::Wait {
            return Err(IpamError::conflict(format!(
                "only wait ranges can be reserved, {old} is {}",
                old.status
            )));
        }

        let mut range = old.clone();
        range.status = RangeStatus::Reserved;
        range.org = Some(org.clone());
        range.assigned_at = None;
        range.user_remark.clear();
        range.updated_at = Utc::now();
        let range = commit_one(tx, range)?;
        log::info!("Reserved {} range {range} for {}", F::LABEL, org.id);

        self.record(
            RecordEvent::Reserve {
                range: range.item(),
                org,
                from: old.status,
            },
            user,
        );
        self.notify(&[range.item()]);
        Ok(range)
    }

    /// Wait or Reserved -> Assigned. A reserved range can only go to the org it was reserved for.
    pub fn assign(&self, id: RangeId, org: OrgRef, user: Option<&UserRef>) -> Result<AddressRange<F>> {
        let tx = self.store.lock(&[id])?;
        let old = locked_row(&tx, id)?;
        match old.status {
            RangeStatus::Wait => {}
            RangeStatus::Reserved if old.org.as_ref() == Some(&org) => {}
            RangeStatus::Reserved => {
                return Err(IpamError::conflict(format!(
                    "{old} is reserved for another organization object"
                )));
            }
            RangeStatus::Assigned => {
                return Err(IpamError::conflict(format!("{old} is already assigned")));
            }
        }

        let now = Utc::now();
        let mut range = old.clone();
        range.status = RangeStatus::Assigned;
        range.org = Some(org.clone());
        range.assigned_at = Some(now);
        range.user_remark.clear();
        range.updated_at = now;
        let range = commit_one(tx, range)?;
        log::info!("Assigned {} range {range} to {}", F::LABEL, org.id);

        self.record(
            RecordEvent::Assign {
                range: range.item(),
                org,
                from: old.status,
            },
            user,
        );
        self.notify(&[range.item()]);
        Ok(range)
    }

    /// Reserved or Assigned -> Wait. A Wait range is returned unchanged.
    pub fn recover(&self, id: RangeId, user: Option<&UserRef>) -> Result<AddressRange<F>> {
        let tx = self.store.lock(&[id])?;
        let old = locked_row(&tx, id)?;
        if old.status == RangeStatus::Wait {
            return Ok(old);
        }

        let mut range = old.clone();
        range.status = RangeStatus::Wait;
        range.org = None;
        range.assigned_at = None;
        range.user_remark.clear();
        range.updated_at = Utc::now();
        let range = commit_one(tx, range)?;
        log::info!("Recovered {} range {range} from {}", F::LABEL, old.status);

        self.record(
            RecordEvent::Recover {
                range: range.item(),
                org: old.org,
                from: old.status,
            },
            user,
        );
        self.notify(&[range.item()]);
        Ok(range)
    }

    /// Set the user remark, the admin remark, or both. Not recorded in the ledger.
    ///
    /// The admin remark needs `privileged`; the user remark can only be set on an
    /// Assigned range. Organization membership is checked by the caller.
    pub fn change_remark(
        &self,
        id: RangeId,
        user_remark: Option<&str>,
        admin_remark: Option<&str>,
        privileged: bool,
    ) -> Result<AddressRange<F>> {
        if user_remark.is_none() && admin_remark.is_none() {
            return Err(IpamError::invalid("a remark or an admin remark is required"));
        }
        if admin_remark.is_some() && !privileged {
            return Err(IpamError::invalid("changing the admin remark needs system-wide privilege"));
        }

        let tx = self.store.lock(&[id])?;
        let mut range = locked_row(&tx, id)?;
        if let Some(remark) = user_remark {
            if range.status != RangeStatus::Assigned {
                return Err(IpamError::conflict(format!(
                    "the user remark can only be set on an assigned range, {range} is {}",
                    range.status
                )));
            }
            range.user_remark = remark.to_string();
        }
        if let Some(remark) = admin_remark {
            range.admin_remark = remark.to_string();
        }
        range.updated_at = Utc::now();
        commit_one(tx, range)
    }
}

/// Replace the locked row with `range` (same id).
fn commit_one<F: IpFamily>(tx: Transaction<'_, F>, range: AddressRange<F>) -> Result<AddressRange<F>> {
    let id = range.id;
    tx.commit(&[id], vec![range])?
        .pop()
        .ok_or_else(|| IpamError::not_found(format!("{} range {id}", F::LABEL)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordType, V4, V6};
    use crate::processing::manager::test_support::{asn, manager, seed};

    fn org(id: &str) -> OrgRef {
        OrgRef::new(id, "org1")
    }

    fn user() -> UserRef {
        UserRef("admin@example.com".into())
    }

    #[test]
    fn test_create_records_add() {
        let (manager, ledger) = manager::<V4>();
        let item = RangeItem::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let range = manager.create(NewRange::new(item, asn(7497)), Some(&user())).unwrap();
        assert_eq!(range.status, RangeStatus::Wait);
        assert_eq!(range.name, "10.0.0.0/24");

        let records = ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type(), RecordType::Add);
        assert!(records[0].event.secondary().is_empty());

        let err = manager.create(NewRange::new(item, asn(7497)), None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_create_rejects_cross_network() {
        let (manager, _) = manager::<V6>();
        let item = RangeItem::parse("2400::", "2400:0:0:1::", 64).unwrap();
        let err = manager.create(NewRange::new(item, asn(1)), None).unwrap_err();
        assert_eq!(err.code(), "ValidationError");
    }

    #[test]
    fn test_state_machine() {
        let (manager, ledger) = manager::<V4>();
        let r = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Wait);

        let reserved = manager.reserve(r.id, org("vo1"), None).unwrap();
        assert_eq!(reserved.status, RangeStatus::Reserved);
        assert!(reserved.assigned_at.is_none());
        assert_eq!(manager.reserve(r.id, org("vo1"), None).unwrap_err().code(), "ConflictError");

        let err = manager.assign(r.id, org("vo2"), None).unwrap_err();
        assert_eq!(err.code(), "ConflictError");
        let assigned = manager.assign(r.id, org("vo1"), None).unwrap();
        assert_eq!(assigned.status, RangeStatus::Assigned);
        assert!(assigned.assigned_at.is_some());

        let recovered = manager.recover(r.id, None).unwrap();
        assert_eq!(recovered.status, RangeStatus::Wait);
        assert!(recovered.org.is_none());
        assert!(recovered.assigned_at.is_none());

        let types: Vec<RecordType> = ledger.records().iter().map(|r| r.record_type()).collect();
        assert_eq!(types, vec![RecordType::Reserve, RecordType::Assign, RecordType::Recover]);
        let recover = &ledger.records()[2];
        assert_eq!(recover.remark, "wait from assigned");
        assert_eq!(recover.event.org(), Some(&org("vo1")));
    }

    #[test]
    fn test_recover_wait_is_noop() {
        let (manager, ledger) = manager::<V4>();
        let r = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Wait);
        assert_eq!(manager.recover(r.id, None).unwrap(), r);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_assign_clears_user_remark() {
        let (manager, _) = manager::<V4>();
        let r = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Assigned);
        manager.change_remark(r.id, Some("web tier"), None, false).unwrap();
        let recovered = manager.recover(r.id, None).unwrap();
        assert_eq!(recovered.user_remark, "");
        let assigned = manager.assign(r.id, org("vo3"), None).unwrap();
        assert_eq!(assigned.org, Some(org("vo3")));
    }

    #[test]
    fn test_update_records_change_only_for_bounds() {
        let (manager, ledger) = manager::<V4>();
        let r = seed(&manager, "10.0.0.0", "10.0.0.127", 24, RangeStatus::Wait);

        let renamed = manager
            .update(
                r.id,
                RangeUpdate {
                    name: Some("lab".into()),
                    admin_remark: Some("rack 4".into()),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(renamed.name, "lab");
        assert!(ledger.is_empty());

        let grown = RangeItem::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let update = RangeUpdate {
            item: Some(grown),
            ..Default::default()
        };
        manager.update(r.id, update, Some(&user())).unwrap();
        let records = ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type(), RecordType::Change);
        assert_eq!(records[0].event.primary(), &r.item());
        assert_eq!(records[0].event.secondary(), &[grown]);
    }

    #[test]
    fn test_update_can_move_into_own_space_only() {
        let (manager, _) = manager::<V4>();
        let a = seed(&manager, "10.0.0.0", "10.0.0.127", 24, RangeStatus::Wait);
        seed(&manager, "10.0.0.128", "10.0.0.255", 24, RangeStatus::Wait);
        let update = RangeUpdate {
            item: Some(RangeItem::parse("10.0.0.0", "10.0.0.128", 24).unwrap()),
            ..Default::default()
        };
        assert_eq!(manager.update(a.id, update, None).unwrap_err().code(), "ValidationError");
        let update = RangeUpdate {
            item: Some(RangeItem::parse("10.0.0.64", "10.0.0.127", 24).unwrap()),
            ..Default::default()
        };
        assert!(manager.update(a.id, update, None).is_ok());
    }

    #[test]
    fn test_assigned_is_immutable() {
        let (manager, ledger) = manager::<V4>();
        let r = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Assigned);
        let update = RangeUpdate {
            name: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(manager.update(r.id, update, None).unwrap_err().code(), "ConflictError");
        assert_eq!(manager.delete(r.id, None).unwrap_err().code(), "ConflictError");
        assert!(manager.get(r.id).is_ok());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_delete_records_org() {
        let (manager, ledger) = manager::<V4>();
        let r = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Reserved);
        manager.delete(r.id, None).unwrap();
        assert_eq!(manager.get(r.id).unwrap_err().code(), "TargetNotExist");
        assert_eq!(ledger.records()[0].event.org(), r.org.as_ref());
        assert_eq!(manager.delete(r.id, None).unwrap_err().code(), "TargetNotExist");
    }

    #[test]
    fn test_change_remark_rules() {
        let (manager, ledger) = manager::<V4>();
        let wait = seed(&manager, "10.0.0.0", "10.0.0.255", 24, RangeStatus::Wait);
        assert_eq!(
            manager.change_remark(wait.id, None, None, true).unwrap_err().code(),
            "InvalidArgument"
        );
        assert_eq!(
            manager.change_remark(wait.id, None, Some("x"), false).unwrap_err().code(),
            "InvalidArgument"
        );
        assert_eq!(
            manager.change_remark(wait.id, Some("x"), None, true).unwrap_err().code(),
            "ConflictError"
        );
        let r = manager.change_remark(wait.id, None, Some("core"), true).unwrap();
        assert_eq!(r.admin_remark, "core");
        assert!(ledger.is_empty());
    }
}
