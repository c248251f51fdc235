use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkItemStatus;

/// A node in the work breakdown tree.
///
/// Items nest via `parent_id`. On a leaf, `estimated_hours` and `done_ratio`
/// are whatever was entered. On a parent they are **derived fields**: the
/// rollup engine overwrites both from the children on every child mutation,
/// so a parent's recorded values are always a function of its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub status: WorkItemStatus,
    /// Estimated effort in hours. `None` means "not estimated", which is
    /// deliberately distinct from `Some(0.0)`.
    pub estimated_hours: Option<f64>,
    /// Completion percentage, 0–100.
    pub done_ratio: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkItemInput {
    /// Parent item for nesting. `None` creates a root item.
    pub parent_id: Option<Uuid>,
    pub title: String,
    /// Initial status. Defaults to `Open` if not specified.
    pub status: Option<WorkItemStatus>,
    pub estimated_hours: Option<f64>,
    /// Initial completion percentage. Defaults to 0.
    pub done_ratio: Option<u8>,
}

/// Input for updating an existing work item. All fields are optional for
/// partial updates.
///
/// `estimated_hours` is doubly wrapped so that "leave the estimate alone"
/// (`None`) and "clear the estimate" (`Some(None)`) are both expressible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWorkItemInput {
    pub title: Option<String>,
    pub status: Option<WorkItemStatus>,
    pub estimated_hours: Option<Option<f64>>,
    pub done_ratio: Option<u8>,
}

/// A work item with its nested children, used for tree responses.
///
/// The `item` fields are flattened into the JSON output, with an additional
/// `children` array of nested nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemTreeNode {
    #[serde(flatten)]
    pub item: WorkItem,
    pub children: Vec<WorkItemTreeNode>,
}
