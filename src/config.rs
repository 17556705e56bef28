//! Operation limits.
//!
//! The request layer exposes these as UI constants; the engine enforces them
//! as operation parameters. Defaults can be overridden from the environment
//! (the binary loads `.env` first).

use crate::models::IpFamily;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_SPLIT_PREFIX_DIFF: &str = "IPAM_SPLIT_PREFIX_DIFF";
pub const ENV_PLAN_ENTRIES_V4: &str = "IPAM_PLAN_ENTRIES_V4";
pub const ENV_PLAN_ENTRIES_V6: &str = "IPAM_PLAN_ENTRIES_V6";
pub const ENV_MERGE_MEMBERS: &str = "IPAM_MERGE_MEMBERS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Largest `new_prefix - prefix` a uniform split may use (fan-out `2^diff`).
    pub split_prefix_diff: u8,
    /// Largest explicit split plan for IPv4.
    pub plan_entries_v4: usize,
    /// Largest explicit split plan for IPv6.
    pub plan_entries_v6: usize,
    /// Largest number of ranges in one merge.
    pub merge_members: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            split_prefix_diff: 8,
            plan_entries_v4: 1024,
            plan_entries_v6: 256,
            merge_members: 256,
        }
    }
}

impl Limits {
    /// Defaults with any valid environment overrides applied.
    pub fn from_env() -> Self {
        let defaults = Limits::default();
        Limits {
            split_prefix_diff: env_or(ENV_SPLIT_PREFIX_DIFF, defaults.split_prefix_diff),
            plan_entries_v4: env_or(ENV_PLAN_ENTRIES_V4, defaults.plan_entries_v4),
            plan_entries_v6: env_or(ENV_PLAN_ENTRIES_V6, defaults.plan_entries_v6),
            merge_members: env_or(ENV_MERGE_MEMBERS, defaults.merge_members),
        }
    }

    /// Explicit plan size limit for family `F`.
    pub fn plan_entries<F: IpFamily>(&self) -> usize {
        if F::WIDTH > 32 {
            self.plan_entries_v6
        } else {
            self.plan_entries_v4
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_positive(&raw).unwrap_or_else(|| {
            log::warn!("Ignoring {key}={raw:?}, keeping {default}");
            default
        }),
        Err(_) => default,
    }
}

/// Zero would disable the operation altogether, so it is rejected like garbage.
fn parse_positive<T: FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().all(|c| c == '0') {
        return None;
    }
    raw.parse().ok()
}
