//! Width-parameterised CIDR bit arithmetic.
//!
//! Addresses are plain `u128` bit patterns; `width` is 32 for IPv4 and 128 for
//! IPv6. Nothing here touches storage.

use crate::error::{IpamError, Result};

/// All-ones value covering an address space of `width` bits.
pub fn space_mask(width: u8) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// Host part of a `prefix`-length network in a `width`-bit space.
fn host_mask(width: u8, prefix: u8) -> u128 {
    let host_bits = width.saturating_sub(prefix);
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

/// Reject prefix lengths outside `0..=width`.
pub fn check_prefix(width: u8, prefix: u8) -> Result<()> {
    if prefix > width {
        Err(IpamError::invalid(format!(
            "prefix length /{prefix} is out of range 0-{width}"
        )))
    } else {
        Ok(())
    }
}

/// Convert a prefix length to a network mask.
///
/// ```
/// use ipam_ledger::math::get_cidr_mask;
/// assert_eq!(get_cidr_mask(32, 24).unwrap(), 0xFFFF_FF00);
/// ```
pub fn get_cidr_mask(width: u8, prefix: u8) -> Result<u128> {
    check_prefix(width, prefix)?;
    Ok(space_mask(width) & !host_mask(width, prefix))
}

/// Network address of `bits` under `prefix`.
pub fn cut_addr(bits: u128, width: u8, prefix: u8) -> Result<u128> {
    let mask = get_cidr_mask(width, prefix)?;
    Ok(bits & mask)
}

/// Highest address of the `prefix`-length network containing `bits`.
pub fn broadcast_addr(bits: u128, width: u8, prefix: u8) -> Result<u128> {
    let network = cut_addr(bits, width, prefix)?;
    Ok(network | host_mask(width, prefix))
}

/// First address after the `prefix`-length network containing `bits`, if any.
pub fn ip_after_subnet(bits: u128, width: u8, prefix: u8) -> Result<Option<u128>> {
    let broadcast = broadcast_addr(bits, width, prefix)?;
    if broadcast >= space_mask(width) {
        Ok(None)
    } else {
        Ok(Some(broadcast + 1))
    }
}

/// Smallest prefix length for which `bits` is a valid network address.
pub fn lo_mask(bits: u128, width: u8) -> u8 {
    let bits = bits & space_mask(width);
    if bits == 0 {
        return 0;
    }
    let trailing_zeros = bits.trailing_zeros().min(u32::from(width));
    // trailing_zeros <= width <= 128, fits in u8
    width - trailing_zeros as u8
}

/// Number of addresses in the inclusive interval. `None` for the whole IPv6
/// space, whose 2^128 addresses do not fit a `u128`.
pub fn span_len(start: u128, end: u128) -> Option<u128> {
    (end - start).checked_add(1)
}
