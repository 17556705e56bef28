//! Address-range records and the opaque references they carry.

use super::cidr::{Cidr, RangeItem};
use super::family::IpFamily;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique row identifier. The nil id marks a range that was never saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeId(pub Uuid);

impl RangeId {
    pub fn new() -> RangeId {
        RangeId(Uuid::new_v4())
    }

    /// Id of an unsaved (dry-run) range.
    pub fn nil() -> RangeId {
        RangeId(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for RangeId {
    fn default() -> Self {
        RangeId::new()
    }
}

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Organizational consumer a range is reserved or assigned to.
///
/// `id` names the consumer object, `org_id` the organization that owns it.
/// Neither is interpreted beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgRef {
    pub id: String,
    pub org_id: String,
}

impl OrgRef {
    pub fn new(id: impl Into<String>, org_id: impl Into<String>) -> OrgRef {
        OrgRef {
            id: id.into(),
            org_id: org_id.into(),
        }
    }
}

/// AS-number entity, created on demand from a raw number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsnRef {
    pub id: u32,
    pub number: u32,
    pub name: String,
}

/// The user an audit record is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(pub String);

/// Allocation state of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeStatus {
    Wait,
    Reserved,
    Assigned,
}

impl RangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeStatus::Wait => "wait",
            RangeStatus::Reserved => "reserved",
            RangeStatus::Assigned => "assigned",
        }
    }

    /// Wait and Reserved ranges may be edited, deleted, split and merged.
    pub fn is_mutable(&self) -> bool {
        matches!(self, RangeStatus::Wait | RangeStatus::Reserved)
    }
}

impl fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned address range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AddressRange<F: IpFamily> {
    pub id: RangeId,
    pub name: String,
    pub start: F::Addr,
    pub end: F::Addr,
    pub prefix: u8,
    pub status: RangeStatus,
    pub asn: AsnRef,
    pub org: Option<OrgRef>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub admin_remark: String,
    pub user_remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<F: IpFamily> AddressRange<F> {
    /// A fresh Wait range with a new id. `name` is derived when left blank.
    pub fn build(name: &str, item: RangeItem<F>, asn: AsnRef, now: DateTime<Utc>) -> AddressRange<F> {
        let mut range = AddressRange {
            id: RangeId::new(),
            name: name.trim().to_string(),
            start: item.start,
            end: item.end,
            prefix: item.prefix,
            status: RangeStatus::Wait,
            asn,
            org: None,
            assigned_at: None,
            admin_remark: String::new(),
            user_remark: String::new(),
            created_at: now,
            updated_at: now,
        };
        range.derive_name_if_blank();
        range
    }

    pub fn item(&self) -> RangeItem<F> {
        RangeItem::new(self.start, self.end, self.prefix)
    }

    pub fn start_bits(&self) -> u128 {
        F::to_bits(self.start)
    }

    pub fn end_bits(&self) -> u128 {
        F::to_bits(self.end)
    }

    /// The network of the start address under the range's own prefix.
    pub fn start_network(&self) -> Cidr<F> {
        self.item().start_network()
    }

    /// See [`RangeItem::num_addresses`].
    pub fn num_addresses(&self) -> Option<u128> {
        self.item().num_addresses()
    }

    pub fn check_shape(&self) -> Result<()> {
        self.item().check_shape()
    }

    pub(crate) fn derive_name_if_blank(&mut self) {
        if self.name.is_empty() {
            self.name = self.start_network().to_string();
        }
    }
}

impl<F: IpFamily> fmt::Display for AddressRange<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} /{}", self.start, self.end, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::V4;

    fn asn() -> AsnRef {
        AsnRef {
            id: 1,
            number: 7497,
            name: "AS7497".to_string(),
        }
    }

    #[test]
    fn test_build_derives_name() {
        let item = RangeItem::<V4>::parse("10.0.0.1", "10.0.0.200", 24).unwrap();
        let range = AddressRange::build("  ", item, asn(), Utc::now());
        assert_eq!(range.name, "10.0.0.0/24");
        assert_eq!(range.status, RangeStatus::Wait);
        assert!(range.org.is_none());
        assert_eq!(range.to_string(), "10.0.0.1 - 10.0.0.200 /24");

        let named = AddressRange::build("lab", item, asn(), Utc::now());
        assert_eq!(named.name, "lab");
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&RangeStatus::Reserved).unwrap(), "\"reserved\"");
        let status: RangeStatus = serde_json::from_str("\"assigned\"").unwrap();
        assert_eq!(status, RangeStatus::Assigned);
        assert!(RangeStatus::Wait.is_mutable());
        assert!(!RangeStatus::Assigned.is_mutable());
    }

    #[test]
    fn test_range_id_nil() {
        assert!(RangeId::nil().is_nil());
        assert!(!RangeId::new().is_nil());
    }
}
