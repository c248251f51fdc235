use serde::{Deserialize, Serialize};

/// The workflow status of a work item.
///
/// The one property the rest of the system cares about is whether a status is
/// *closed* (see [`WorkItemStatus::is_closed`]): closed items count as 100%
/// done during rollup no matter what their recorded `done_ratio` says, which
/// guards against stale ratios on finished work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    Open,
    InProgress,
    OnHold,
    Closed,
    Rejected,
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "on_hold" => Some(Self::OnHold),
            "closed" => Some(Self::Closed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether this status means the item is finished.
    ///
    /// `Rejected` counts as closed: the item will not see further work, so it
    /// should not drag its parent's progress down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }
}
