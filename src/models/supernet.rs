//! IPv4 supernets and external (third-party) ranges.

use super::cidr::{Cidr, RangeItem};
use super::family::V4;
use super::range::RangeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Warehouse rollup of a supernet, derived from the ranges it contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupernetStatus {
    /// No range lies inside the supernet.
    #[serde(rename = "out-warehouse")]
    OutOfWarehouse,
    /// Exactly one range spans the whole supernet.
    #[serde(rename = "in-warehouse")]
    InWarehouse,
    /// Several ranges, or one range covering only part of it.
    #[serde(rename = "split")]
    Split,
}

impl fmt::Display for SupernetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupernetStatus::OutOfWarehouse => "out-warehouse",
            SupernetStatus::InWarehouse => "in-warehouse",
            SupernetStatus::Split => "split",
        })
    }
}

/// Coarse-grained IPv4 block tracked for warehouse bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supernet {
    pub id: RangeId,
    pub name: String,
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub prefix: u8,
    pub status: SupernetStatus,
    pub asn: u32,
    pub remark: String,
    pub operator: String,
    /// Addresses inside Assigned ranges.
    pub used_ip_count: u64,
    pub total_ip_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Supernet {
    pub fn item(&self) -> RangeItem<V4> {
        RangeItem::new(self.start, self.end, self.prefix)
    }

    pub fn start_network(&self) -> Cidr<V4> {
        self.item().start_network()
    }
}

impl fmt::Display for Supernet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} /{}", self.start, self.end, self.prefix)
    }
}

/// IPv4 block owned by a third party; descriptive only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRange {
    pub id: RangeId,
    pub name: String,
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub prefix: u8,
    pub asn: u32,
    pub org_name: String,
    pub country: String,
    pub city: String,
    pub remark: String,
    pub operator: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExternalRange {
    pub fn item(&self) -> RangeItem<V4> {
        RangeItem::new(self.start, self.end, self.prefix)
    }
}

impl fmt::Display for ExternalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} /{}", self.start, self.end, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supernet_status_serde() {
        let json = serde_json::to_string(&SupernetStatus::OutOfWarehouse).unwrap();
        assert_eq!(json, "\"out-warehouse\"");
        assert_eq!(SupernetStatus::OutOfWarehouse.to_string(), "out-warehouse");
    }
}
