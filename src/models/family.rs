//! IP address families.
//!
//! The engine keeps IPv4 and IPv6 ranges as two structurally parallel families.
//! All arithmetic runs on `u128` bit patterns parameterised by [`IpFamily::WIDTH`],
//! so the same code serves both 32-bit and 128-bit address spaces.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An address family: its address type and the width of its address space.
pub trait IpFamily:
    Copy + Clone + Debug + Default + PartialEq + Eq + PartialOrd + Ord + Hash + Send + Sync + 'static
{
    /// Address value type.
    type Addr: Copy
        + Ord
        + Eq
        + Hash
        + Debug
        + Display
        + FromStr
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Address width in bits (32 or 128).
    const WIDTH: u8;

    /// Short label for logs and messages.
    const LABEL: &'static str;

    /// Upper bound for `prefixlen_diff` in the minimal split plan.
    const MAX_MIN_SPLIT_DIFF: u8;

    /// Address as an unsigned integer.
    fn to_bits(addr: Self::Addr) -> u128;

    /// Address from an unsigned integer. Bits above `WIDTH` are dropped.
    fn from_bits(bits: u128) -> Self::Addr;
}

/// IPv4: 32-bit address space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct V4;

/// IPv6: 128-bit address space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct V6;

impl IpFamily for V4 {
    type Addr = Ipv4Addr;
    const WIDTH: u8 = 32;
    const LABEL: &'static str = "ipv4";
    const MAX_MIN_SPLIT_DIFF: u8 = 10;

    fn to_bits(addr: Ipv4Addr) -> u128 {
        u128::from(u32::from(addr))
    }

    fn from_bits(bits: u128) -> Ipv4Addr {
        // truncation is the documented contract: callers stay inside the 32-bit space
        Ipv4Addr::from((bits & u128::from(u32::MAX)) as u32)
    }
}

impl IpFamily for V6 {
    type Addr = Ipv6Addr;
    const WIDTH: u8 = 128;
    const LABEL: &'static str = "ipv6";
    const MAX_MIN_SPLIT_DIFF: u8 = 8;

    fn to_bits(addr: Ipv6Addr) -> u128 {
        u128::from(addr)
    }

    fn from_bits(bits: u128) -> Ipv6Addr {
        Ipv6Addr::from(bits)
    }
}
