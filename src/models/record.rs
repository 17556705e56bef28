//! Audit records written after every mutating range operation.

use super::cidr::RangeItem;
use super::family::IpFamily;
use super::range::{OrgRef, RangeStatus, UserRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Add,
    Change,
    Delete,
    Split,
    Merge,
    Reserve,
    Assign,
    Recover,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Add => "add",
            RecordType::Change => "change",
            RecordType::Delete => "delete",
            RecordType::Split => "split",
            RecordType::Merge => "merge",
            RecordType::Reserve => "reserve",
            RecordType::Assign => "assign",
            RecordType::Recover => "recover",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened, with exactly the bounds each operation needs.
///
/// For every kind except `Merge` the primary bounds are the range operated on;
/// for `Merge` they are the resulting range and the members are secondary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "lowercase", bound = "")]
pub enum RecordEvent<F: IpFamily> {
    Add {
        range: RangeItem<F>,
    },
    Change {
        old: RangeItem<F>,
        new: RangeItem<F>,
    },
    Delete {
        range: RangeItem<F>,
        org: Option<OrgRef>,
    },
    Split {
        source: RangeItem<F>,
        subnets: Vec<RangeItem<F>>,
    },
    Merge {
        merged: RangeItem<F>,
        members: Vec<RangeItem<F>>,
    },
    Reserve {
        range: RangeItem<F>,
        org: OrgRef,
        from: RangeStatus,
    },
    Assign {
        range: RangeItem<F>,
        org: OrgRef,
        from: RangeStatus,
    },
    Recover {
        range: RangeItem<F>,
        org: Option<OrgRef>,
        from: RangeStatus,
    },
}

impl<F: IpFamily> RecordEvent<F> {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordEvent::Add { .. } => RecordType::Add,
            RecordEvent::Change { .. } => RecordType::Change,
            RecordEvent::Delete { .. } => RecordType::Delete,
            RecordEvent::Split { .. } => RecordType::Split,
            RecordEvent::Merge { .. } => RecordType::Merge,
            RecordEvent::Reserve { .. } => RecordType::Reserve,
            RecordEvent::Assign { .. } => RecordType::Assign,
            RecordEvent::Recover { .. } => RecordType::Recover,
        }
    }

    pub fn primary(&self) -> &RangeItem<F> {
        match self {
            RecordEvent::Add { range }
            | RecordEvent::Delete { range, .. }
            | RecordEvent::Reserve { range, .. }
            | RecordEvent::Assign { range, .. }
            | RecordEvent::Recover { range, .. } => range,
            RecordEvent::Change { old, .. } => old,
            RecordEvent::Split { source, .. } => source,
            RecordEvent::Merge { merged, .. } => merged,
        }
    }

    pub fn secondary(&self) -> &[RangeItem<F>] {
        match self {
            RecordEvent::Change { new, .. } => std::slice::from_ref(new),
            RecordEvent::Split { subnets, .. } => subnets,
            RecordEvent::Merge { members, .. } => members,
            _ => &[],
        }
    }

    pub fn org(&self) -> Option<&OrgRef> {
        match self {
            RecordEvent::Reserve { org, .. } | RecordEvent::Assign { org, .. } => Some(org),
            RecordEvent::Delete { org, .. } | RecordEvent::Recover { org, .. } => org.as_ref(),
            _ => None,
        }
    }

    /// Default remark: the status transition for lifecycle events.
    pub fn remark(&self) -> String {
        match self {
            RecordEvent::Reserve { from, .. } => format!("{} from {from}", RangeStatus::Reserved),
            RecordEvent::Assign { from, .. } => format!("{} from {from}", RangeStatus::Assigned),
            RecordEvent::Recover { from, .. } => format!("{} from {from}", RangeStatus::Wait),
            _ => String::new(),
        }
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RangeRecord<F: IpFamily> {
    pub id: Uuid,
    #[serde(flatten)]
    pub event: RecordEvent<F>,
    pub user: Option<UserRef>,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

impl<F: IpFamily> RangeRecord<F> {
    pub fn new(event: RecordEvent<F>, user: Option<UserRef>) -> RangeRecord<F> {
        let remark = event.remark();
        RangeRecord {
            id: Uuid::new_v4(),
            event,
            user,
            remark,
            created_at: Utc::now(),
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.event.record_type()
    }

    /// Whether the primary bounds contain `addr`.
    pub fn touches(&self, addr: F::Addr) -> bool {
        self.event.primary().contains(addr)
    }
}

impl<F: IpFamily> fmt::Display for RangeRecord<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.record_type(), self.event.primary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::V4;

    #[test]
    fn test_recover_record() {
        let range = RangeItem::<V4>::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let record = RangeRecord::new(
            RecordEvent::Recover {
                range,
                org: Some(OrgRef::new("vo1", "org1")),
                from: RangeStatus::Assigned,
            },
            None,
        );
        assert_eq!(record.record_type(), RecordType::Recover);
        assert_eq!(record.remark, "wait from assigned");
        assert!(record.event.secondary().is_empty());
        assert_eq!(record.event.org().map(|o| o.id.as_str()), Some("vo1"));
        assert_eq!(record.to_string(), "recover 10.0.0.0-10.0.0.255 /24");
    }

    #[test]
    fn test_change_record_secondary() {
        let old = RangeItem::<V4>::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let new = RangeItem::<V4>::parse("10.0.0.0", "10.0.0.127", 25).unwrap();
        let event = RecordEvent::Change { old, new };
        assert_eq!(event.primary(), &old);
        assert_eq!(event.secondary(), &[new]);
    }

    #[test]
    fn test_record_serde_tag() {
        let range = RangeItem::<V4>::parse("10.0.0.0", "10.0.0.255", 24).unwrap();
        let record = RangeRecord::new(RecordEvent::Add { range }, Some(UserRef("lisi".into())));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record_type"], "add");
        assert_eq!(json["range"]["start"], "10.0.0.0");
        let back: RangeRecord<V4> = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
