//! Domain models for the address-range engine.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`IpFamily`] with [`V4`] and [`V6`] - the two parallel address families
//! - [`Cidr`] and [`RangeItem`] - networks and `{start, end, prefix}` bounds
//! - [`AddressRange`] - an owned range with its allocation state
//! - [`Supernet`] and [`ExternalRange`] - IPv4 warehouse and third-party blocks
//! - [`IndividualAddress`] - remarks on a single address
//! - [`RangeRecord`] - audit ledger entries

mod address;
mod cidr;
mod family;
mod range;
mod record;
mod supernet;

// Re-export public types
pub use address::IndividualAddress;
pub use cidr::{parse_addr, Cidr, RangeItem};
pub use family::{IpFamily, V4, V6};
pub use range::{AddressRange, AsnRef, OrgRef, RangeId, RangeStatus, UserRef};
pub use record::{RangeRecord, RecordEvent, RecordType};
pub use supernet::{ExternalRange, Supernet, SupernetStatus};
