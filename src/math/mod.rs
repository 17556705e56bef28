//! Address arithmetic over both families.
//!
//! - [`bits`] - width-parameterised mask/network/broadcast helpers on `u128`
//! - family-typed operations: [`subnets_of`], [`supernet_of`], [`same_network`],
//!   [`contiguous`] and [`free_blocks`]
//!
//! All failures are local value errors ([`IpamError::InvalidArgument`]).

pub mod bits;

pub use bits::{broadcast_addr, cut_addr, get_cidr_mask, ip_after_subnet, lo_mask, space_mask};

use crate::error::{IpamError, Result};
use crate::models::{Cidr, IpFamily, RangeItem};

/// Enumerate the `new_prefix` networks intersecting `range`, clipped to its bounds.
///
/// The first and last entries may be partial blocks when `range` itself does not
/// start or end on a `new_prefix` boundary.
pub fn subnets_of<F: IpFamily>(range: &RangeItem<F>, new_prefix: u8) -> Result<Vec<RangeItem<F>>> {
    bits::check_prefix(F::WIDTH, range.prefix)?;
    bits::check_prefix(F::WIDTH, new_prefix)?;
    if new_prefix < range.prefix {
        return Err(IpamError::invalid(format!(
            "subnet prefix /{new_prefix} must not be shorter than /{}",
            range.prefix
        )));
    }

    let start = range.start_bits();
    let end = range.end_bits();
    if start > end {
        return Err(IpamError::invalid(format!("invalid bounds {range}")));
    }

    let mut subnets = Vec::new();
    let mut cursor = bits::cut_addr(start, F::WIDTH, new_prefix)?;
    loop {
        let sn_end = bits::broadcast_addr(cursor, F::WIDTH, new_prefix)?;
        subnets.push(RangeItem::new(
            F::from_bits(cursor.max(start)),
            F::from_bits(sn_end.min(end)),
            new_prefix,
        ));
        if sn_end >= end {
            break;
        }
        cursor = sn_end + 1;
    }
    Ok(subnets)
}

/// The network containing `addr` at the shorter length `prefix`.
pub fn supernet_of<F: IpFamily>(addr: F::Addr, prefix: u8) -> Result<Cidr<F>> {
    Ok(Cidr::from_parts(addr, prefix)?.network())
}

/// Whether both addresses fall in the same `prefix`-length network.
pub fn same_network<F: IpFamily>(a: F::Addr, b: F::Addr, prefix: u8) -> Result<bool> {
    let a_net = bits::cut_addr(F::to_bits(a), F::WIDTH, prefix)?;
    let b_net = bits::cut_addr(F::to_bits(b), F::WIDTH, prefix)?;
    Ok(a_net == b_net)
}

/// Whether `b_start` immediately follows `a_end`.
pub fn contiguous<F: IpFamily>(a_end: F::Addr, b_start: F::Addr) -> bool {
    F::to_bits(b_start).checked_sub(F::to_bits(a_end)) == Some(1)
}

/// Largest CIDR-aligned blocks covering the parts of `outer` not covered by `occupied`.
///
/// `occupied` must be sorted by start address and non-overlapping; entries outside
/// `outer` are ignored. Blocks are never coarser than `outer.prefix`.
pub fn free_blocks<F: IpFamily>(outer: &RangeItem<F>, occupied: &[RangeItem<F>]) -> Result<Vec<Cidr<F>>> {
    outer.check_shape()?;
    let outer_end = outer.end_bits();
    let mut blocks = Vec::new();
    let mut next_ip = Some(outer.start_bits());

    for taken in occupied {
        let Some(cursor) = next_ip else { break };
        let taken_start = taken.start_bits();
        let taken_end = taken.end_bits();
        if taken_end < cursor || taken_start > outer_end {
            continue;
        }
        if cursor < taken_start {
            fill_gap::<F>(cursor, taken_start - 1, outer.prefix, &mut blocks)?;
        }
        next_ip = if taken_end >= outer_end { None } else { Some(taken_end + 1) };
    }
    if let Some(cursor) = next_ip {
        fill_gap::<F>(cursor, outer_end, outer.prefix, &mut blocks)?;
    }
    Ok(blocks)
}

fn fill_gap<F: IpFamily>(mut start: u128, end: u128, min_prefix: u8, out: &mut Vec<Cidr<F>>) -> Result<()> {
    loop {
        let prefix = find_biggest_subnet(start, end, min_prefix, F::WIDTH)?;
        out.push(Cidr::from_parts(F::from_bits(start), prefix)?);
        let block_end = bits::broadcast_addr(start, F::WIDTH, prefix)?;
        if block_end >= end {
            return Ok(());
        }
        start = block_end + 1;
    }
}

/// Find the shortest prefix for a block starting at `start` that stays at or below `limit`.
///
/// The result is constrained by:
/// 1. `min_prefix` (never a coarser block)
/// 2. alignment - `start` must be the network address of the block
/// 3. the block must not run past `limit`
fn find_biggest_subnet(start: u128, limit: u128, min_prefix: u8, width: u8) -> Result<u8> {
    let mut prefix = min_prefix.max(bits::lo_mask(start, width));
    while bits::broadcast_addr(start, width, prefix)? > limit {
        prefix += 1;
    }
    Ok(prefix)
}
