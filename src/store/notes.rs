//! Remarks on individual addresses.

use crate::error::{IpamError, Result};
use crate::models::{IndividualAddress, IpFamily};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Per-address annotations of family `F`, unique per address value.
#[derive(Debug)]
pub struct AddressNotes<F: IpFamily> {
    rows: RwLock<BTreeMap<u128, IndividualAddress<F>>>,
}

impl<F: IpFamily> Default for AddressNotes<F> {
    fn default() -> Self {
        AddressNotes {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<F: IpFamily> AddressNotes<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<IndividualAddress<F>>) -> Self {
        AddressNotes {
            rows: RwLock::new(entries.into_iter().map(|n| (F::to_bits(n.address), n)).collect()),
        }
    }

    /// Set the user remark, the admin remark, or both. Creates the row on first use.
    pub fn change_remark(
        &self,
        address: F::Addr,
        remark: Option<&str>,
        admin_remark: Option<&str>,
    ) -> Result<IndividualAddress<F>> {
        if remark.is_none() && admin_remark.is_none() {
            return Err(IpamError::invalid("a remark or an admin remark is required"));
        }
        let now = Utc::now();
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let note = rows.entry(F::to_bits(address)).or_insert_with(|| IndividualAddress {
            address,
            admin_remark: String::new(),
            user_remark: String::new(),
            created_at: now,
            updated_at: now,
        });
        if let Some(remark) = remark {
            note.user_remark = remark.to_string();
        }
        if let Some(admin_remark) = admin_remark {
            note.admin_remark = admin_remark.to_string();
        }
        note.updated_at = now;
        Ok(note.clone())
    }

    pub fn get(&self, address: F::Addr) -> Option<IndividualAddress<F>> {
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&F::to_bits(address))
            .cloned()
    }

    /// Notes between `start` and `end` (inclusive), ordered by address.
    ///
    /// `remark` is matched case-insensitively against the user remark, and the
    /// admin remark when `privileged`. `Some("")` keeps only annotated addresses.
    pub fn filter(
        &self,
        start: Option<F::Addr>,
        end: Option<F::Addr>,
        remark: Option<&str>,
        privileged: bool,
    ) -> Vec<IndividualAddress<F>> {
        let lo = start.map(F::to_bits).unwrap_or(0);
        let hi = end.map(F::to_bits).unwrap_or(u128::MAX);
        if lo > hi {
            return Vec::new();
        }
        let needle = remark.map(|r| r.trim().to_lowercase());
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .range(lo..=hi)
            .map(|(_, note)| note)
            .filter(|note| match needle.as_deref() {
                None => true,
                Some("") => note.is_annotated(privileged),
                Some(text) => {
                    note.user_remark.to_lowercase().contains(text)
                        || (privileged && note.admin_remark.to_lowercase().contains(text))
                }
            })
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> Vec<IndividualAddress<F>> {
        self.filter(None, None, None, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::V4;
    use std::net::Ipv4Addr;

    #[test]
    fn test_change_remark_creates_lazily() {
        let notes = AddressNotes::<V4>::new();
        let addr = Ipv4Addr::new(10, 0, 0, 5);
        assert!(notes.get(addr).is_none());
        assert!(notes.change_remark(addr, None, None).is_err());

        let n = notes.change_remark(addr, Some("gateway"), None).unwrap();
        assert_eq!(n.user_remark, "gateway");
        let n = notes.change_remark(addr, None, Some("core switch")).unwrap();
        assert_eq!(n.user_remark, "gateway");
        assert_eq!(n.admin_remark, "core switch");
        assert_eq!(notes.entries().len(), 1);
    }

    #[test]
    fn test_filter() {
        let notes = AddressNotes::<V4>::new();
        notes.change_remark(Ipv4Addr::new(10, 0, 0, 1), Some("gw"), None).unwrap();
        notes.change_remark(Ipv4Addr::new(10, 0, 0, 2), None, Some("mgmt")).unwrap();
        notes.change_remark(Ipv4Addr::new(10, 0, 1, 1), Some(""), None).unwrap();

        let in_net = notes.filter(Some(Ipv4Addr::new(10, 0, 0, 0)), Some(Ipv4Addr::new(10, 0, 0, 255)), None, false);
        assert_eq!(in_net.len(), 2);
        assert_eq!(notes.filter(None, None, Some(""), false).len(), 1);
        assert_eq!(notes.filter(None, None, Some(""), true).len(), 2);
        assert_eq!(notes.filter(None, None, Some("MGMT"), false).len(), 0);
        assert_eq!(notes.filter(None, None, Some("MGMT"), true).len(), 1);
    }
}
