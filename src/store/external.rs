//! Registry of IPv4 blocks owned by third parties.

use super::table::Table;
use crate::error::{IpamError, Result};
use crate::models::{ExternalRange, RangeId, RangeItem, V4};
use chrono::Utc;
use std::net::Ipv4Addr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Caller-supplied fields of an external range.
#[derive(Debug, Clone, Default)]
pub struct ExternalRangeInput {
    pub name: String,
    pub start: Option<Ipv4Addr>,
    pub end: Option<Ipv4Addr>,
    pub prefix: u8,
    pub asn: u32,
    pub org_name: String,
    pub country: String,
    pub city: String,
    pub remark: String,
}

impl ExternalRangeInput {
    fn item(&self) -> Result<RangeItem<V4>> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(IpamError::invalid("start and end address are required"));
        };
        let item = RangeItem::new(start, end, self.prefix);
        item.check_shape().map_err(|e| IpamError::validation(e.message()))?;
        Ok(item)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExternalFilter {
    pub asn: Option<u32>,
    pub contains: Option<Ipv4Addr>,
    /// Matched against name, remark, organization name, country and city.
    pub search: Option<String>,
}

impl ExternalFilter {
    fn matches(&self, row: &ExternalRange) -> bool {
        if self.asn.is_some_and(|asn| asn != row.asn) {
            return false;
        }
        if self.contains.is_some_and(|addr| !(row.start <= addr && addr <= row.end)) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                [&row.name, &row.remark, &row.org_name, &row.country, &row.city]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// External ranges. Same shape and overlap rules as owned ranges, in a table of their own.
#[derive(Debug, Default)]
pub struct ExternalRangeStore {
    table: RwLock<Table<ExternalRange>>,
}

impl ExternalRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Table<ExternalRange>> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table<ExternalRange>> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create(&self, input: ExternalRangeInput, operator: &str) -> Result<ExternalRange> {
        let item = input.item()?;
        let now = Utc::now();
        let row = ExternalRange {
            id: RangeId::new(),
            name: derive_name(&input.name, &item),
            start: item.start,
            end: item.end,
            prefix: item.prefix,
            asn: input.asn,
            org_name: input.org_name,
            country: input.country,
            city: input.city,
            remark: input.remark,
            operator: operator.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.write().insert(row.clone())?;
        log::info!("Created external range {row}");
        Ok(row)
    }

    pub fn update(&self, id: RangeId, input: ExternalRangeInput, operator: &str) -> Result<ExternalRange> {
        let item = input.item()?;
        let mut table = self.write();
        let mut row = table
            .get(&id)
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("external range {id}")))?;
        row.name = derive_name(&input.name, &item);
        row.start = item.start;
        row.end = item.end;
        row.prefix = item.prefix;
        row.asn = input.asn;
        row.org_name = input.org_name;
        row.country = input.country;
        row.city = input.city;
        row.remark = input.remark;
        row.operator = operator.to_string();
        row.updated_at = Utc::now();
        table.replace(row.clone())?;
        log::info!("Updated external range {row}");
        Ok(row)
    }

    pub fn delete(&self, id: RangeId) -> Result<ExternalRange> {
        let row = self
            .write()
            .remove(&id)
            .ok_or_else(|| IpamError::not_found(format!("external range {id}")))?;
        log::info!("Deleted external range {row}");
        Ok(row)
    }

    /// Restore a saved row unchanged.
    pub fn restore(&self, row: ExternalRange) -> Result<()> {
        row.item().check_shape()?;
        self.write().insert(row)
    }

    pub fn get(&self, id: RangeId) -> Result<ExternalRange> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("external range {id}")))
    }

    pub fn find_containing(&self, addr: Ipv4Addr) -> Result<ExternalRange> {
        self.read()
            .find_containing(u128::from(u32::from(addr)))
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("no external range contains {addr}")))
    }

    pub fn filter(&self, filter: &ExternalFilter) -> Vec<ExternalRange> {
        self.read().iter().filter(|r| filter.matches(r)).cloned().collect()
    }
}

fn derive_name(name: &str, item: &RangeItem<V4>) -> String {
    match name.trim() {
        "" => item.start_network().to_string(),
        name => name.to_string(),
    }
}
