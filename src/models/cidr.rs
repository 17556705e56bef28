//! CIDR networks and address-range bounds.
//!
//! Provides [`Cidr`] (an address with a prefix length, e.g. `10.0.0.0/24`) and
//! [`RangeItem`], the `{start, end, prefix}` triple used for split plans and
//! ledger entries.

use super::family::IpFamily;
use crate::error::{IpamError, Result};
use crate::math::bits;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An address with a prefix length.
#[derive(Debug, Clone, Copy, Hash)]
pub struct Cidr<F: IpFamily> {
    /// The address (not necessarily the network address).
    pub addr: F::Addr,
    /// Prefix length (0 to `F::WIDTH`).
    pub prefix: u8,
}

/// Parse one address of family `F`.
pub fn parse_addr<F: IpFamily>(text: &str) -> Result<F::Addr> {
    text.trim()
        .parse::<F::Addr>()
        .map_err(|_| IpamError::invalid(format!("invalid {} address '{}'", F::LABEL, text.trim())))
}

impl<F: IpFamily> Cidr<F> {
    /// Create a [`Cidr`] from a string like `10.0.0.0/24`.
    pub fn new(addr_cidr: &str) -> Result<Cidr<F>> {
        let addr_cidr = addr_cidr.trim();
        let (addr, prefix) = addr_cidr
            .split_once('/')
            .ok_or_else(|| IpamError::invalid(format!("invalid address/prefix '{addr_cidr}'")))?;
        let addr = parse_addr::<F>(addr)?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| IpamError::invalid(format!("invalid prefix length '{prefix}'")))?;
        Cidr::from_parts(addr, prefix)
    }

    /// Create a [`Cidr`] after checking the prefix length.
    pub fn from_parts(addr: F::Addr, prefix: u8) -> Result<Cidr<F>> {
        bits::check_prefix(F::WIDTH, prefix)?;
        Ok(Cidr { addr, prefix })
    }

    /// Lowest (network) address.
    pub fn lo(&self) -> F::Addr {
        // prefix was checked on construction
        F::from_bits(F::to_bits(self.addr) & bits::get_cidr_mask(F::WIDTH, self.prefix).unwrap_or(0))
    }

    /// Highest address.
    pub fn hi(&self) -> F::Addr {
        let mask = bits::get_cidr_mask(F::WIDTH, self.prefix).unwrap_or(0);
        F::from_bits((F::to_bits(self.addr) & mask) | (bits::space_mask(F::WIDTH) & !mask))
    }

    /// The same network written with its network address.
    pub fn network(&self) -> Cidr<F> {
        Cidr {
            addr: self.lo(),
            prefix: self.prefix,
        }
    }

    /// Whether `addr` falls inside this network.
    pub fn contains(&self, addr: F::Addr) -> bool {
        self.lo() <= addr && addr <= self.hi()
    }
}

impl<F: IpFamily> fmt::Display for Cidr<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl<F: IpFamily> PartialEq for Cidr<F> {
    fn eq(&self, other: &Cidr<F>) -> bool {
        self.addr == other.addr && self.prefix == other.prefix
    }
}

impl<F: IpFamily> Eq for Cidr<F> {}

impl<F: IpFamily> Ord for Cidr<F> {
    fn cmp(&self, other: &Cidr<F>) -> Ordering {
        self.addr
            .cmp(&other.addr)
            .then_with(|| self.prefix.cmp(&other.prefix))
    }
}

impl<F: IpFamily> PartialOrd for Cidr<F> {
    fn partial_cmp(&self, other: &Cidr<F>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F: IpFamily> Serialize for Cidr<F> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, F: IpFamily> Deserialize<'de> for Cidr<F> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Cidr<F>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cidr::new(&s).map_err(|e| de::Error::custom(e.message().to_string()))
    }
}

/// Inclusive address bounds with the prefix length that governs them.
///
/// The first and last subnet of a split may be partial blocks, so `start` is
/// not always a network address and `end` not always a broadcast address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RangeItem<F: IpFamily> {
    pub start: F::Addr,
    pub end: F::Addr,
    pub prefix: u8,
}

impl<F: IpFamily> RangeItem<F> {
    pub fn new(start: F::Addr, end: F::Addr, prefix: u8) -> RangeItem<F> {
        RangeItem { start, end, prefix }
    }

    /// Parse `start`, `end` and a prefix length.
    pub fn parse(start: &str, end: &str, prefix: u8) -> Result<RangeItem<F>> {
        Ok(RangeItem {
            start: parse_addr::<F>(start)?,
            end: parse_addr::<F>(end)?,
            prefix,
        })
    }

    pub fn start_bits(&self) -> u128 {
        F::to_bits(self.start)
    }

    pub fn end_bits(&self) -> u128 {
        F::to_bits(self.end)
    }

    /// Number of addresses covered, `None` only for `::/0` (2^128 addresses).
    pub fn num_addresses(&self) -> Option<u128> {
        bits::span_len(self.start_bits(), self.end_bits())
    }

    /// The network the start address belongs to under `prefix`.
    pub fn start_network(&self) -> Cidr<F> {
        Cidr {
            addr: self.start,
            prefix: self.prefix,
        }
        .network()
    }

    /// Whether `addr` lies within the bounds.
    pub fn contains(&self, addr: F::Addr) -> bool {
        self.start <= addr && addr <= self.end
    }

    /// Check prefix range, bound order and that both ends share one network.
    pub fn check_shape(&self) -> Result<()> {
        bits::check_prefix(F::WIDTH, self.prefix)?;
        if self.start > self.end {
            return Err(IpamError::invalid(format!(
                "end address must not be lower than start address ({self})"
            )));
        }
        let start_net = bits::cut_addr(self.start_bits(), F::WIDTH, self.prefix)?;
        let end_net = bits::cut_addr(self.end_bits(), F::WIDTH, self.prefix)?;
        if start_net != end_net {
            return Err(IpamError::invalid(format!(
                "start network {}/{p} and end network {}/{p} differ",
                F::from_bits(start_net),
                F::from_bits(end_net),
                p = self.prefix
            )));
        }
        Ok(())
    }
}

impl<F: IpFamily> fmt::Display for RangeItem<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{} /{}", self.start, self.end, self.prefix)
    }
}
