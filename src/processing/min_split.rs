//! Minimal split plan.
//!
//! Splitting a /8 straight into /24s would create 65536 rows. The minimal plan
//! instead halves only the lowest piece, one prefix length at a time, until it
//! is within `prefixlen_diff` of the target, then splits that piece into target
//! subnets. Every other piece stays as large as possible:
//!
//! ```text
//! 10.0.0.0/8, target /24, diff 3:
//!   /9 -> /10 -> ... -> /21 on the first piece
//!   first /21 -> 8 x /24
//!   result: 8 x /24, /21, /20, /19, ... , /9
//! ```
//!
//! When the first piece yields fewer than `2^(diff-1)` target subnets, the
//! second piece is split the same way with `diff - 1` and its first piece split
//! into target subnets too.

use super::manager::RangeManager;
use crate::error::{IpamError, Result};
use crate::math::{bits, subnets_of};
use crate::models::{IpFamily, RangeId, RangeItem};

/// Plan a split of `range` into mostly `new_prefix` subnets, ordered by start.
///
/// Nothing is stored; feed the result to [`RangeManager::split_to_plan`] to apply it.
pub fn minimal_split_plan<F: IpFamily>(
    range: &RangeItem<F>,
    new_prefix: u8,
    prefixlen_diff: u8,
) -> Result<Vec<RangeItem<F>>> {
    bits::check_prefix(F::WIDTH, new_prefix)?;
    if new_prefix <= range.prefix {
        return Err(IpamError::invalid(format!(
            "target prefix /{new_prefix} must be longer than /{} of {range}",
            range.prefix
        )));
    }
    if !(1..=F::MAX_MIN_SPLIT_DIFF).contains(&prefixlen_diff) {
        return Err(IpamError::invalid(format!(
            "prefixlen_diff must be 1-{}, got {prefixlen_diff}",
            F::MAX_MIN_SPLIT_DIFF
        )));
    }
    range.check_shape()?;

    let pieces = split_step_by_step(range, new_prefix, prefixlen_diff)?;
    split_to_target(pieces, new_prefix, prefixlen_diff)
}

/// Halve the first piece for each prefix from `range.prefix + 1` to `new_prefix - diff`.
fn split_step_by_step<F: IpFamily>(range: &RangeItem<F>, new_prefix: u8, diff: u8) -> Result<Vec<RangeItem<F>>> {
    let mut pieces = vec![*range];
    let Some(step_end) = new_prefix.checked_sub(diff) else {
        return Ok(pieces);
    };
    for next_prefix in (range.prefix + 1)..=step_end {
        let halves = subnets_of(&pieces[0], next_prefix)?;
        pieces.splice(0..1, halves);
    }
    Ok(pieces)
}

fn split_to_target<F: IpFamily>(mut pieces: Vec<RangeItem<F>>, new_prefix: u8, diff: u8) -> Result<Vec<RangeItem<F>>> {
    let need = 1usize << (diff - 1);
    let first = pieces.remove(0);
    let mut plan = subnets_of(&first, new_prefix)?;
    if plan.len() >= need || pieces.is_empty() {
        plan.extend(pieces);
        return Ok(plan);
    }

    // too few target subnets from the first piece, top up from the second
    let second = pieces.remove(0);
    let mut second_pieces = split_step_by_step(&second, new_prefix, diff.saturating_sub(1).max(1))?;
    let second_first = second_pieces.remove(0);
    plan.extend(subnets_of(&second_first, new_prefix)?);
    plan.extend(second_pieces);
    plan.extend(pieces);
    plan.sort_by_key(|p| p.start);
    Ok(plan)
}

impl<F: IpFamily> RangeManager<F> {
    /// Minimal split plan for a stored range.
    pub fn minimal_split(&self, id: RangeId, new_prefix: u8, prefixlen_diff: u8) -> Result<Vec<RangeItem<F>>> {
        let range = self.store.get(id)?;
        minimal_split_plan(&range.item(), new_prefix, prefixlen_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::contiguous;
    use crate::models::{V4, V6};

    fn assert_partition<F: IpFamily>(range: &RangeItem<F>, plan: &[RangeItem<F>]) {
        assert_eq!(plan.first().map(|p| p.start), Some(range.start));
        assert_eq!(plan.last().map(|p| p.end), Some(range.end));
        for pair in plan.windows(2) {
            assert!(contiguous::<F>(pair[0].end, pair[1].start), "gap between {} and {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_plan_slash8_to_slash24() {
        let range = RangeItem::<V4>::parse("10.0.0.1", "10.255.255.255", 8).unwrap();
        let plan = minimal_split_plan(&range, 24, 3).unwrap();
        assert_partition(&range, &plan);

        let targets = plan.iter().take_while(|p| p.prefix == 24).count();
        assert_eq!(targets, 8);
        assert_eq!(plan[0].to_string(), "10.0.0.1-10.0.0.255 /24");
        let rest: Vec<u8> = plan[targets..].iter().map(|p| p.prefix).collect();
        assert_eq!(rest, (9..=21).rev().collect::<Vec<u8>>());
    }

    #[test]
    fn test_plan_within_diff_is_uniform() {
        let range = RangeItem::<V4>::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let plan = minimal_split_plan(&range, 26, 3).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|p| p.prefix == 26));
    }

    #[test]
    fn test_plan_tops_up_from_second_piece() {
        // the first /22 only covers 10.0.3.0-10.0.3.255, one /24
        let range = RangeItem::<V4>::parse("10.0.3.0", "10.0.255.255", 16).unwrap();
        let plan = minimal_split_plan(&range, 24, 2).unwrap();
        assert_partition(&range, &plan);
        let shown: Vec<String> = plan.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "10.0.3.0-10.0.3.255 /24",
                "10.0.4.0-10.0.4.255 /24",
                "10.0.5.0-10.0.5.255 /24",
                "10.0.6.0-10.0.7.255 /23",
                "10.0.8.0-10.0.15.255 /21",
                "10.0.16.0-10.0.31.255 /20",
                "10.0.32.0-10.0.63.255 /19",
                "10.0.64.0-10.0.127.255 /18",
                "10.0.128.0-10.0.255.255 /17",
            ]
        );
    }

    #[test]
    fn test_plan_v6() {
        let range = RangeItem::<V6>::parse("2400:dd01:1010::", "2400:dd01:1010:ffff:ffff:ffff:ffff:ffff", 48).unwrap();
        let plan = minimal_split_plan(&range, 64, 4).unwrap();
        assert_partition(&range, &plan);
        assert_eq!(plan.iter().filter(|p| p.prefix == 64).count(), 16);
        assert!(minimal_split_plan(&range, 64, 9).is_err());
    }

    #[test]
    fn test_plan_errors() {
        let range = RangeItem::<V4>::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        assert!(minimal_split_plan(&range, 24, 3).is_err());
        assert!(minimal_split_plan(&range, 33, 3).is_err());
        assert!(minimal_split_plan(&range, 28, 0).is_err());
        assert!(minimal_split_plan(&range, 28, 11).is_err());
        let bent = RangeItem::<V4>::parse("10.0.0.0", "10.0.1.255", 24).unwrap();
        assert!(minimal_split_plan(&bent, 28, 3).is_err());
    }
}
