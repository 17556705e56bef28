//! Storage for ranges and their side tables.
//!
//! - [`RangeStore`] - the authoritative range table of one family, with row locks
//!   and [`Transaction`]s
//! - [`RangeFilter`] - listing criteria
//! - [`AsnRegistry`], [`AddressNotes`], [`ExternalRangeStore`] - side tables
//! - [`snapshot`] - JSON save/load of everything

mod asn;
mod external;
mod filter;
mod locks;
mod notes;
mod ranges;
pub mod snapshot;
pub mod table;

pub use asn::AsnRegistry;
pub use external::{ExternalFilter, ExternalRangeInput, ExternalRangeStore};
pub use filter::RangeFilter;
pub use locks::{RowGuard, RowLocks};
pub use notes::AddressNotes;
pub use ranges::{RangeStore, Transaction};
pub use snapshot::IpamSnapshot;
