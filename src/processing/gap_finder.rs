//! Gap finding between ranges.
//!
//! Turns an ordered range listing into print rows, inserting `-gap-` rows for
//! the unallocated CIDR blocks between consecutive ranges.

use crate::error::Result;
use crate::math;
use crate::models::{AddressRange, IpFamily, RangeItem};

/// One row of a range listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePrintRow {
    /// Row index, 0 for gap rows.
    pub j: usize,
    /// `-gap-` or the range status.
    pub gap: String,
    /// Network of the start address.
    pub cidr: String,
    pub start: String,
    pub end: String,
    /// Address count, `2^128` for the whole IPv6 space.
    pub hosts: String,
    pub name: String,
    pub asn: String,
    pub org: String,
    pub remark: String,
}

/// Rows for `ranges` (sorted by start) with gap rows in between.
pub fn range_rows<F: IpFamily>(ranges: &[AddressRange<F>]) -> Result<Vec<RangePrintRow>> {
    let mut rows = Vec::new();
    let mut next_ip: Option<u128> = None;

    for (i, r) in ranges.iter().enumerate() {
        if let Some(gap_start) = next_ip.filter(|n| *n < r.start_bits()) {
            let gap = RangeItem::<F>::new(F::from_bits(gap_start), F::from_bits(r.start_bits() - 1), 0);
            for block in math::free_blocks(&gap, &[])? {
                rows.push(RangePrintRow {
                    j: 0,
                    gap: "-gap-".to_string(),
                    cidr: block.to_string(),
                    start: block.lo().to_string(),
                    end: block.hi().to_string(),
                    hosts: host_count(math::bits::span_len(F::to_bits(block.lo()), F::to_bits(block.hi()))),
                    name: "None".to_string(),
                    asn: "None".to_string(),
                    org: "None".to_string(),
                    remark: String::new(),
                });
            }
        }

        rows.push(RangePrintRow {
            j: i + 1,
            gap: r.status.to_string(),
            cidr: r.start_network().to_string(),
            start: r.start.to_string(),
            end: r.end.to_string(),
            hosts: host_count(r.num_addresses()),
            name: r.name.clone(),
            asn: format!("AS{}", r.asn.number),
            org: r.org.as_ref().map_or_else(|| "None".to_string(), |o| o.org_id.clone()),
            remark: r.admin_remark.clone(),
        });

        // end of the address space leaves nothing to fill after it
        next_ip = r.end_bits().checked_add(1).filter(|n| *n <= math::space_mask(F::WIDTH));
    }
    Ok(rows)
}

fn host_count(n: Option<u128>) -> String {
    n.map_or_else(|| "2^128".to_string(), |n| n.to_string())
}
