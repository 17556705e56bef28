//! JSON snapshot of every table.
//!
//! Saves the whole engine state to one file and reads it back. Parse errors
//! carry the JSON path of the offending value.

use crate::error::SnapshotError;
use crate::models::{
    AddressRange, AsnRef, ExternalRange, IndividualAddress, RangeRecord, Supernet, V4, V6,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Plain rows of every table, in the order they were listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpamSnapshot {
    pub asns: Vec<AsnRef>,
    pub ipv4_ranges: Vec<AddressRange<V4>>,
    pub ipv6_ranges: Vec<AddressRange<V6>>,
    pub supernets: Vec<Supernet>,
    pub external_ranges: Vec<ExternalRange>,
    pub ipv4_notes: Vec<IndividualAddress<V4>>,
    pub ipv6_notes: Vec<IndividualAddress<V6>>,
    pub ipv4_records: Vec<RangeRecord<V4>>,
    pub ipv6_records: Vec<RangeRecord<V6>>,
}

impl IpamSnapshot {
    pub fn from_json(json: &str) -> Result<IpamSnapshot, SnapshotError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| SnapshotError::Json {
            path: e.path().to_string(),
            message: e.inner().to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Json {
            path: ".".to_string(),
            message: e.to_string(),
        })
    }
}

/// Read a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<IpamSnapshot, SnapshotError> {
    let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::info!("Reading snapshot file: {}", path.display());
    IpamSnapshot::from_json(&json)
}

/// Write a snapshot file, replacing any existing one.
pub fn write_snapshot(path: &Path, snapshot: &IpamSnapshot) -> Result<(), SnapshotError> {
    let json = snapshot.to_json()?;
    log::info!("Writing snapshot file: {}", path.display());
    std::fs::write(path, json).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })
}
