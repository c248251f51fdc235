//! Recomputation of inherited attributes.
//!
//! [`RollupService`] is the caller the engine itself stays ignorant of: it
//! fetches the children snapshot, runs [`rollup`](crate::rollup::rollup) and
//! persists the result onto the parent. After any child mutation the whole
//! ancestor chain is stale, so mutating code paths go through
//! [`RollupService::recompute_ancestors`].

use thiserror::Error;
use uuid::Uuid;

use crate::db::Database;
use crate::models::WorkItem;
use crate::rollup;

#[derive(Debug, Error)]
pub enum RollupError {
    #[error("work item {0} not found")]
    NotFound(Uuid),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub struct RollupService {
    db: Database,
}

impl RollupService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Recompute one item's derived `done_ratio` and `estimated_hours` from
    /// its direct children and persist them.
    ///
    /// Returns the updated item. An item with no children ends up at
    /// `0` / no estimate.
    pub fn recompute(&self, id: Uuid) -> Result<WorkItem, RollupError> {
        let children = self.db.child_progress(id)?;
        let derived = rollup::rollup(&children);

        if !self.db.store_rollup(id, &derived)? {
            return Err(RollupError::NotFound(id));
        }

        tracing::debug!(
            "Recomputed {}: done_ratio={} estimated_hours={:?} from {} children",
            id,
            derived.done_ratio,
            derived.estimated_hours,
            children.len()
        );

        self.db
            .get_work_item(id)?
            .ok_or(RollupError::NotFound(id))
    }

    /// Recompute every ancestor of `id`, nearest first.
    ///
    /// Called after a mutation of `id` itself; the item's own fields are the
    /// mutation's business, only its ancestors inherit. Returns the updated
    /// ancestors in recomputation order.
    pub fn recompute_ancestors(&self, id: Uuid) -> Result<Vec<WorkItem>, RollupError> {
        let item = self
            .db
            .get_work_item(id)?
            .ok_or(RollupError::NotFound(id))?;

        let mut updated = Vec::new();
        let mut next = item.parent_id;
        while let Some(parent_id) = next {
            let parent = self.recompute(parent_id)?;
            next = parent.parent_id;
            updated.push(parent);
        }

        Ok(updated)
    }
}
