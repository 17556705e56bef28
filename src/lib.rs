//! IPv4/IPv6 address-range allocation engine.
//!
//! Ranges move through Wait, Reserved and Assigned, can be split into subnets
//! and merged back, and every committed change is written to an audit ledger.
//!
//! # Modules
//!
//! - [`models`] - Address families, CIDR values, ranges, supernets, ledger records
//! - [`math`] - Prefix and interval arithmetic on both families
//! - [`store`] - Range tables, row locks, side tables and JSON snapshots
//! - [`processing`] - Lifecycle, split, merge, supernet warehouse and ledger
//! - [`output`] - CSV listings with gap rows
//! - [`ipam`] - The engine with everything wired together

pub mod config;
pub mod error;
pub mod ipam;
pub mod math;
pub mod models;
pub mod output;
pub mod processing;
pub mod store;

// Re-export commonly used items at crate root
pub use config::Limits;
pub use error::{IpamError, LedgerError, Result, SnapshotError};
pub use ipam::Ipam;
pub use models::{AddressRange, IpFamily, RangeId, RangeItem, RangeStatus, V4, V6};
pub use processing::{NewRange, RangeManager, RangeUpdate};
