//! Listing filters for address ranges.

use crate::models::{AddressRange, IpFamily, RangeStatus};

/// Criteria for [`RangeStore::filter`](super::RangeStore::filter). Unset fields match everything.
#[derive(Debug, Clone)]
pub struct RangeFilter<F: IpFamily> {
    /// Organization ids the range's bound consumer must belong to.
    pub org_ids: Option<Vec<String>>,
    pub status: Option<RangeStatus>,
    /// AS number (not registry id).
    pub asn: Option<u32>,
    /// Address that must fall inside the range.
    pub contains: Option<F::Addr>,
    /// Case-insensitive text matched against name and user remark, and against
    /// the admin remark when `privileged` is set.
    pub search: Option<String>,
    pub privileged: bool,
}

// `F::Addr` has no `Default`, so this can't be derived.
impl<F: IpFamily> Default for RangeFilter<F> {
    fn default() -> Self {
        RangeFilter {
            org_ids: None,
            status: None,
            asn: None,
            contains: None,
            search: None,
            privileged: false,
        }
    }
}

impl<F: IpFamily> RangeFilter<F> {
    /// Everything, as seen by a system-wide reader.
    pub fn admin() -> Self {
        RangeFilter {
            privileged: true,
            ..Default::default()
        }
    }

    /// Assigned ranges of the organizations an org administrator manages.
    ///
    /// An empty `org_ids` yields nothing.
    pub fn for_org_admin(org_ids: Vec<String>) -> Self {
        RangeFilter {
            org_ids: Some(org_ids),
            status: Some(RangeStatus::Assigned),
            ..Default::default()
        }
    }

    pub fn matches(&self, range: &AddressRange<F>) -> bool {
        if let Some(org_ids) = &self.org_ids {
            match &range.org {
                Some(org) if org_ids.iter().any(|id| *id == org.org_id) => {}
                _ => return false,
            }
        }
        if self.status.is_some_and(|status| status != range.status) {
            return false;
        }
        if self.asn.is_some_and(|asn| asn != range.asn.number) {
            return false;
        }
        if self.contains.is_some_and(|addr| !(range.start <= addr && addr <= range.end)) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => self.search_hit(range, &text.to_lowercase()),
            _ => true,
        }
    }

    fn search_hit(&self, range: &AddressRange<F>, needle: &str) -> bool {
        range.name.to_lowercase().contains(needle)
            || range.user_remark.to_lowercase().contains(needle)
            || (self.privileged && range.admin_remark.to_lowercase().contains(needle))
    }
}
