//! IPv4 supernet bookkeeping.
//!
//! A supernet's status and used-IP count are derived from the ranges lying
//! fully inside it. [`SupernetWarehouse`] recomputes them whenever a supernet is
//! written and, as a [`RangeObserver`], whenever ranges appear or disappear.

use super::lifecycle::NewRange;
use super::manager::{RangeManager, RangeObserver};
use crate::error::{IpamError, Result};
use crate::math;
use crate::models::{
    AddressRange, AsnRef, Cidr, RangeId, RangeItem, RangeStatus, Supernet, SupernetStatus, UserRef, V4,
};
use crate::store::table::Table;
use crate::store::RangeStore;
use chrono::Utc;
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Per-status tally of the ranges inside one supernet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubnetCollector {
    pub assigned_ranges: Vec<RangeId>,
    pub assigned_ip_count: u64,
    pub reserved_ranges: Vec<RangeId>,
    pub reserved_ip_count: u64,
    pub wait_ranges: Vec<RangeId>,
    pub wait_ip_count: u64,
    pub subnet_count: usize,
}

impl SubnetCollector {
    pub fn collect<'a>(ranges: impl IntoIterator<Item = &'a AddressRange<V4>>) -> SubnetCollector {
        let mut collector = SubnetCollector::default();
        for range in ranges {
            let count = ip_count(range.num_addresses());
            let (ids, total) = match range.status {
                RangeStatus::Assigned => (&mut collector.assigned_ranges, &mut collector.assigned_ip_count),
                RangeStatus::Reserved => (&mut collector.reserved_ranges, &mut collector.reserved_ip_count),
                RangeStatus::Wait => (&mut collector.wait_ranges, &mut collector.wait_ip_count),
            };
            ids.push(range.id);
            *total += count;
            collector.subnet_count += 1;
        }
        collector
    }

    pub fn subnet_ip_count(&self) -> u64 {
        self.assigned_ip_count + self.reserved_ip_count + self.wait_ip_count
    }

    /// Status of a supernet holding `supernet_ip_count` addresses.
    pub fn status(&self, supernet_ip_count: u64) -> SupernetStatus {
        match self.subnet_count {
            0 => SupernetStatus::OutOfWarehouse,
            1 if self.subnet_ip_count() >= supernet_ip_count => SupernetStatus::InWarehouse,
            _ => SupernetStatus::Split,
        }
    }
}

fn ip_count(n: Option<u128>) -> u64 {
    n.and_then(|n| u64::try_from(n).ok()).unwrap_or(u64::MAX)
}

/// Caller-supplied fields of a supernet. The name is always derived.
#[derive(Debug, Clone, Default)]
pub struct SupernetInput {
    pub start: Option<Ipv4Addr>,
    pub end: Option<Ipv4Addr>,
    pub prefix: u8,
    pub asn: u32,
    pub remark: String,
}

impl SupernetInput {
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
pub struct SupernetFilter {
    pub status: Option<SupernetStatus>,
    pub asn: Option<u32>,
    pub contains: Option<Ipv4Addr>,
    /// Matched against name and remark.
    pub search: Option<String>,
}

impl SupernetFilter {
    fn matches(&self, row: &Supernet) -> bool {
        if self.status.is_some_and(|s| s != row.status) {
            return false;
        }
        if self.asn.is_some_and(|asn| asn != row.asn) {
            return false;
        }
        if self.contains.is_some_and(|addr| !row.item().contains(addr)) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                row.name.to_lowercase().contains(&needle) || row.remark.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// Supernet table kept in step with the IPv4 range store.
#[derive(Debug)]
pub struct SupernetWarehouse {
    ranges: Arc<RangeStore<V4>>,
    table: RwLock<Table<Supernet>>,
}

impl SupernetWarehouse {
    pub fn new(ranges: Arc<RangeStore<V4>>) -> Self {
        SupernetWarehouse {
            ranges,
            table: RwLock::new(Table::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Table<Supernet>> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table<Supernet>> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Tally of the ranges fully inside `item`.
    pub fn collect(&self, item: &RangeItem<V4>) -> SubnetCollector {
        SubnetCollector::collect(&self.ranges.contained_in(item.start, item.end))
    }

    pub fn create(&self, input: SupernetInput, operator: &str) -> Result<Supernet> {
        let item = input.item()?;
        let collector = self.collect(&item);
        let total_ip_count = ip_count(item.num_addresses());
        let now = Utc::now();
        let row = Supernet {
            id: RangeId::new(),
            name: item.start_network().to_string(),
            start: item.start,
            end: item.end,
            prefix: item.prefix,
            status: collector.status(total_ip_count),
            asn: input.asn,
            remark: input.remark,
            operator: operator.to_string(),
            used_ip_count: collector.assigned_ip_count,
            total_ip_count,
            created_at: now,
            updated_at: now,
        };
        self.write().insert(row.clone())?;
        log::info!("Created supernet {row} ({})", row.status);
        Ok(row)
    }

    /// Replace bounds, AS and remark. An empty remark keeps the old one.
    pub fn update(&self, id: RangeId, input: SupernetInput, operator: &str) -> Result<Supernet> {
        let item = input.item()?;
        let collector = self.collect(&item);
        let mut table = self.write();
        let mut row = table
            .get(&id)
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("supernet {id}")))?;
        row.start = item.start;
        row.end = item.end;
        row.prefix = item.prefix;
        row.name = item.start_network().to_string();
        row.asn = input.asn;
        if !input.remark.is_empty() {
            row.remark = input.remark;
        }
        row.operator = operator.to_string();
        row.total_ip_count = ip_count(item.num_addresses());
        row.status = collector.status(row.total_ip_count);
        row.used_ip_count = collector.assigned_ip_count;
        row.updated_at = Utc::now();
        table.replace(row.clone())?;
        log::info!("Updated supernet {row} ({})", row.status);
        Ok(row)
    }

    pub fn delete(&self, id: RangeId) -> Result<Supernet> {
        let row = self
            .write()
            .remove(&id)
            .ok_or_else(|| IpamError::not_found(format!("supernet {id}")))?;
        log::info!("Deleted supernet {row}");
        Ok(row)
    }

    /// Restore a saved row, then re-derive its status.
    pub fn restore(&self, row: Supernet) -> Result<()> {
        row.item().check_shape()?;
        let id = row.id;
        self.write().insert(row)?;
        self.refresh_ids(&[id]);
        Ok(())
    }

    pub fn get(&self, id: RangeId) -> Result<Supernet> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("supernet {id}")))
    }

    pub fn find_containing(&self, addr: Ipv4Addr) -> Result<Supernet> {
        self.read()
            .find_containing(u128::from(u32::from(addr)))
            .cloned()
            .ok_or_else(|| IpamError::not_found(format!("no supernet contains {addr}")))
    }

    pub fn list(&self) -> Vec<Supernet> {
        self.read().iter().cloned().collect()
    }

    pub fn filter(&self, filter: &SupernetFilter) -> Vec<Supernet> {
        self.read().iter().filter(|s| filter.matches(s)).cloned().collect()
    }

    /// Re-derive every supernet overlapping one of `spans`. Returns how many changed.
    pub fn refresh(&self, spans: &[RangeItem<V4>]) -> usize {
        let ids: Vec<RangeId> = self
            .read()
            .iter()
            .filter(|s| spans.iter().any(|span| span.start <= s.end && s.start <= span.end))
            .map(|s| s.id)
            .collect();
        self.refresh_ids(&ids)
    }

    pub fn refresh_all(&self) -> usize {
        let ids: Vec<RangeId> = self.read().iter().map(|s| s.id).collect();
        self.refresh_ids(&ids)
    }

    fn refresh_ids(&self, ids: &[RangeId]) -> usize {
        let mut changed = 0;
        for id in ids {
            let Ok(current) = self.get(*id) else { continue };
            let collector = self.collect(&current.item());
            let status = collector.status(current.total_ip_count);
            if status == current.status && collector.assigned_ip_count == current.used_ip_count {
                continue;
            }

            let mut table = self.write();
            // bounds may have moved since the tally was taken
            let Some(mut row) = table.get(id).filter(|r| r.item() == current.item()).cloned() else {
                continue;
            };
            row.status = status;
            row.used_ip_count = collector.assigned_ip_count;
            log::debug!("Supernet {row} is now {status}, {} IPs used", row.used_ip_count);
            if table.replace(row).is_ok() {
                changed += 1;
            }
        }
        changed
    }

    /// Stock an out-of-warehouse supernet with one Wait range covering it exactly.
    pub fn put_in_warehouse(
        &self,
        id: RangeId,
        manager: &RangeManager<V4>,
        asn: AsnRef,
        user: Option<&UserRef>,
    ) -> Result<(Supernet, AddressRange<V4>)> {
        let supernet = self.get(id)?;
        if supernet.status != SupernetStatus::OutOfWarehouse {
            return Err(IpamError::conflict(format!(
                "supernet {supernet} is {}, not out-warehouse",
                supernet.status
            )));
        }

        let mut new = NewRange::new(supernet.item(), asn);
        new.admin_remark = supernet.remark.clone();
        let range = manager.create(new, user)?;
        self.refresh_ids(&[id]);
        let supernet = self.get(id)?;
        log::info!("Put supernet {supernet} in warehouse as {range}");
        Ok((supernet, range))
    }

    /// Largest CIDR blocks inside the supernet not covered by any range.
    pub fn free_blocks(&self, id: RangeId) -> Result<Vec<Cidr<V4>>> {
        let supernet = self.get(id)?;
        let outer = supernet.item();
        let occupied: Vec<RangeItem<V4>> = self
            .ranges
            .list()
            .iter()
            .filter(|r| r.start <= outer.end && outer.start <= r.end)
            .map(|r| r.item())
            .collect();
        math::free_blocks(&outer, &occupied)
    }
}

impl RangeObserver<V4> for SupernetWarehouse {
    fn ranges_changed(&self, spans: &[RangeItem<V4>]) {
        self.refresh(spans);
    }
}
