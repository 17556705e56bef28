//! Splitting one range into many.
//!
//! Two ways to split a Wait or Reserved range:
//! - [`RangeManager::split_by_prefix`] - every `new_prefix` network of the range
//! - [`RangeManager::split_to_plan`] - a caller-supplied contiguous partition
//!
//! The source row is removed and the subnets inserted in one transaction; the
//! subnets inherit AS, status, organization and admin remark.

use super::manager::{locked_row, require_mutable, RangeManager};
use crate::error::{IpamError, Result};
use crate::math;
use crate::models::{AddressRange, IpFamily, RangeId, RangeItem, RecordEvent, UserRef};
use crate::store::Transaction;
use chrono::Utc;

impl<F: IpFamily> RangeManager<F> {
    /// Split into every `new_prefix` network of the range, edges clipped.
    ///
    /// With `dry_run` nothing is locked or written and the returned subnets have
    /// nil ids; validation, including the fan-out limit, is identical.
    pub fn split_by_prefix(
        &self,
        id: RangeId,
        new_prefix: u8,
        dry_run: bool,
        user: Option<&UserRef>,
    ) -> Result<Vec<AddressRange<F>>> {
        if dry_run {
            let source = self.store.get(id)?;
            let items = self.uniform_plan(&source, new_prefix)?;
            return Ok(build_subnets(&source, &items, true));
        }

        let tx = self.store.lock(&[id])?;
        let source = locked_row(&tx, id)?;
        let items = self.uniform_plan(&source, new_prefix)?;
        self.commit_split(tx, source, items, user)
    }

    /// Split along an explicit partition of the range.
    ///
    /// A plan of one entry equal to the source leaves it untouched and writes no record.
    pub fn split_to_plan(
        &self,
        id: RangeId,
        plan: &[RangeItem<F>],
        user: Option<&UserRef>,
    ) -> Result<Vec<AddressRange<F>>> {
        let tx = self.store.lock(&[id])?;
        let source = locked_row(&tx, id)?;
        require_mutable(&source, "split")?;
        validate_plan(&source.item(), plan, self.limits.plan_entries::<F>())?;

        if let [only] = plan {
            if *only == source.item() {
                log::debug!("Plan for {source} is the range itself, nothing to split");
                return Ok(vec![source]);
            }
        }
        self.commit_split(tx, source, plan.to_vec(), user)
    }

    fn uniform_plan(&self, source: &AddressRange<F>, new_prefix: u8) -> Result<Vec<RangeItem<F>>> {
        if new_prefix > F::WIDTH {
            return Err(IpamError::invalid(format!(
                "subnet prefix /{new_prefix} is longer than /{}",
                F::WIDTH
            )));
        }
        if new_prefix <= source.prefix {
            return Err(IpamError::invalid(format!(
                "subnet prefix /{new_prefix} must be longer than /{} of {source}",
                source.prefix
            )));
        }
        let diff = new_prefix - source.prefix;
        if diff > self.limits.split_prefix_diff {
            return Err(IpamError::conflict(format!(
                "splitting /{} into /{new_prefix} yields {} subnets, at most {} allowed",
                source.prefix,
                1u128 << diff,
                1u128 << self.limits.split_prefix_diff
            )));
        }
        require_mutable(source, "split")?;
        math::subnets_of(&source.item(), new_prefix)
    }

    fn commit_split(
        &self,
        tx: Transaction<'_, F>,
        source: AddressRange<F>,
        items: Vec<RangeItem<F>>,
        user: Option<&UserRef>,
    ) -> Result<Vec<AddressRange<F>>> {
        let subnets = build_subnets(&source, &items, false);
        let subnets = tx.commit(&[source.id], subnets).map_err(|e| match e {
            IpamError::Validation(msg) => {
                IpamError::validation(format!("subnets of {source} break the range table: {msg}"))
            }
            other => other,
        })?;
        log::info!("Split {} range {source} into {} subnets", F::LABEL, subnets.len());

        self.record(
            RecordEvent::Split {
                source: source.item(),
                subnets: items,
            },
            user,
        );
        self.notify(&[source.item()]);
        Ok(subnets)
    }
}

/// Check that `plan` is an ordered, gap-free partition of `source`.
pub fn validate_plan<F: IpFamily>(source: &RangeItem<F>, plan: &[RangeItem<F>], max_entries: usize) -> Result<()> {
    let (Some(first), Some(last)) = (plan.first(), plan.last()) else {
        return Err(IpamError::invalid("split plan is empty"));
    };
    if plan.len() > max_entries {
        return Err(IpamError::invalid(format!(
            "split plan has {} entries, at most {max_entries} allowed",
            plan.len()
        )));
    }
    if first.start != source.start {
        return Err(IpamError::invalid(format!(
            "plan starts at {}, range starts at {}",
            first.start, source.start
        )));
    }
    if last.end != source.end {
        return Err(IpamError::invalid(format!(
            "plan ends at {}, range ends at {}",
            last.end, source.end
        )));
    }

    let mut previous: Option<&RangeItem<F>> = None;
    for entry in plan {
        if entry.prefix < source.prefix {
            return Err(IpamError::invalid(format!(
                "subnet {entry} has a shorter prefix than /{}",
                source.prefix
            )));
        }
        if entry.prefix > F::WIDTH {
            return Err(IpamError::invalid(format!(
                "subnet {entry} has a prefix longer than /{}",
                F::WIDTH
            )));
        }
        if entry.start > entry.end {
            return Err(IpamError::invalid(format!("subnet {entry} ends before it starts")));
        }
        if let Some(prev) = previous {
            if !math::contiguous::<F>(prev.end, entry.start) {
                return Err(IpamError::invalid(format!(
                    "adjacent subnets are not contiguous: {prev}; {entry}"
                )));
            }
        }
        previous = Some(entry);
    }
    Ok(())
}

/// Rows for `items`, inheriting from `source`. Unsaved rows get the nil id.
fn build_subnets<F: IpFamily>(source: &AddressRange<F>, items: &[RangeItem<F>], unsaved: bool) -> Vec<AddressRange<F>> {
    let now = Utc::now();
    items
        .iter()
        .map(|item| {
            let mut subnet = AddressRange::build("", *item, source.asn.clone(), now);
            if unsaved {
                subnet.id = RangeId::nil();
            }
            subnet.status = source.status;
            subnet.org = source.org.clone();
            subnet.assigned_at = source.assigned_at;
            subnet.admin_remark = source.admin_remark.clone();
            subnet
        })
        .collect()
}
