//! Per-address annotations.

use super::family::IpFamily;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single annotated address, created the first time someone remarks on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct IndividualAddress<F: IpFamily> {
    pub address: F::Addr,
    pub admin_remark: String,
    pub user_remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<F: IpFamily> IndividualAddress<F> {
    pub fn is_annotated(&self, privileged: bool) -> bool {
        !self.user_remark.is_empty() || (privileged && !self.admin_remark.is_empty())
    }
}
