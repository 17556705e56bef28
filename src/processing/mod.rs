//! Range operations.
//!
//! This module contains the business logic on top of [`crate::store`]:
//! - [`RangeManager`] - entry point per family; lifecycle transitions in
//!   [`lifecycle`], splitting in [`splitter`] and [`min_split`], merging in `merger`
//! - [`SupernetWarehouse`] - IPv4 supernet status rollup
//! - [`RecordLedger`] - audit trail written after every committed mutation
//! - [`range_rows`] - listing rows with gaps between ranges

mod gap_finder;
pub mod ledger;
pub mod lifecycle;
mod manager;
mod merger;
pub mod min_split;
pub mod splitter;
pub mod warehouse;

// Re-export public types
pub use gap_finder::{range_rows, RangePrintRow};
pub use ledger::{MemoryLedger, RecordLedger, RecordQuery};
pub use lifecycle::{NewRange, RangeUpdate};
pub use manager::{RangeManager, RangeObserver};
pub use min_split::minimal_split_plan;
pub use splitter::validate_plan;
pub use warehouse::{SubnetCollector, SupernetFilter, SupernetInput, SupernetWarehouse};
