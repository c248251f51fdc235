mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::*;
use crate::rollup::{ChildProgress, Rollup};

/// Sqlite-backed store for the work item tree.
///
/// All access goes through a single mutex-guarded connection, so a
/// read-children-then-write-parent sequence performed under one lock is
/// serialized against concurrent mutations of the same parent.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "work-rollup")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("rollup.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Work item operations
    // ============================================================

    pub fn get_roots(&self) -> Result<Vec<WorkItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, title, status, estimated_hours, done_ratio, created_at, updated_at
             FROM work_items WHERE parent_id IS NULL ORDER BY created_at, title",
        )?;

        let items = stmt
            .query_map([], |row| {
                Ok(WorkItem {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    parent_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
                    title: row.get(2)?,
                    status: WorkItemStatus::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(WorkItemStatus::Open),
                    estimated_hours: row.get(4)?,
                    done_ratio: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                    updated_at: parse_datetime(row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn get_children(&self, parent_id: Uuid) -> Result<Vec<WorkItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, title, status, estimated_hours, done_ratio, created_at, updated_at
             FROM work_items WHERE parent_id = ? ORDER BY created_at, title",
        )?;

        let items = stmt
            .query_map([parent_id.to_string()], |row| {
                Ok(WorkItem {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    parent_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
                    title: row.get(2)?,
                    status: WorkItemStatus::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(WorkItemStatus::Open),
                    estimated_hours: row.get(4)?,
                    done_ratio: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                    updated_at: parse_datetime(row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn get_work_item(&self, id: Uuid) -> Result<Option<WorkItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, title, status, estimated_hours, done_ratio, created_at, updated_at
             FROM work_items WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(WorkItem {
                id: parse_uuid(row.get::<_, String>(0)?),
                parent_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
                title: row.get(2)?,
                status: WorkItemStatus::from_str(&row.get::<_, String>(3)?)
                    .unwrap_or(WorkItemStatus::Open),
                estimated_hours: row.get(4)?,
                done_ratio: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
                created_at: parse_datetime(row.get::<_, String>(6)?),
                updated_at: parse_datetime(row.get::<_, String>(7)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn create_work_item(&self, input: CreateWorkItemInput) -> Result<WorkItem> {
        // Verify parent exists before inserting under it
        if let Some(parent_id) = input.parent_id {
            self.get_work_item(parent_id)?
                .ok_or_else(|| anyhow::anyhow!("Parent work item not found"))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = input.status.unwrap_or(WorkItemStatus::Open);
        let done_ratio = input.done_ratio.unwrap_or(0).min(100);

        conn.execute(
            "INSERT INTO work_items (id, parent_id, title, status, estimated_hours, done_ratio, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.parent_id.map(|u| u.to_string()),
                &input.title,
                status.as_str(),
                input.estimated_hours,
                i64::from(done_ratio),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(WorkItem {
            id,
            parent_id: input.parent_id,
            title: input.title,
            status,
            estimated_hours: input.estimated_hours,
            done_ratio,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_work_item(&self, id: Uuid, input: UpdateWorkItemInput) -> Result<Option<WorkItem>> {
        let Some(existing) = self.get_work_item(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let status = input.status.unwrap_or(existing.status);
        let estimated_hours = input.estimated_hours.unwrap_or(existing.estimated_hours);
        let done_ratio = input.done_ratio.unwrap_or(existing.done_ratio).min(100);

        conn.execute(
            "UPDATE work_items SET title = ?, status = ?, estimated_hours = ?, done_ratio = ?, updated_at = ?
             WHERE id = ?",
            (
                &title,
                status.as_str(),
                estimated_hours,
                i64::from(done_ratio),
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(WorkItem {
            id,
            parent_id: existing.parent_id,
            title,
            status,
            estimated_hours,
            done_ratio,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_work_item(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM work_items WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Build the nested tree rooted at `id`.
    pub fn get_work_item_tree(&self, id: Uuid) -> Result<Option<WorkItemTreeNode>> {
        let Some(item) = self.get_work_item(id)? else {
            return Ok(None);
        };

        let children = self
            .get_children(item.id)?
            .into_iter()
            .map(|child| self.get_work_item_tree(child.id))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        Ok(Some(WorkItemTreeNode { item, children }))
    }

    // ============================================================
    // Rollup boundaries
    // ============================================================

    /// Snapshot fetch: the fields of every direct child that the rollup
    /// engine looks at.
    pub fn child_progress(&self, parent_id: Uuid) -> Result<Vec<ChildProgress>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT status, estimated_hours, done_ratio FROM work_items WHERE parent_id = ?",
        )?;

        let snapshots = stmt
            .query_map([parent_id.to_string()], |row| {
                Ok(ChildProgress {
                    closed: WorkItemStatus::from_str(&row.get::<_, String>(0)?)
                        .is_some_and(|s| s.is_closed()),
                    estimated_hours: row.get(1)?,
                    done_ratio: row.get::<_, i64>(2)?.clamp(0, 100) as u8,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    /// Write-back: overwrite the parent's two derived columns.
    pub fn store_rollup(&self, parent_id: Uuid, rollup: &Rollup) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let rows = conn.execute(
            "UPDATE work_items SET done_ratio = ?, estimated_hours = ?, updated_at = ? WHERE id = ?",
            (
                i64::from(rollup.done_ratio),
                rollup.estimated_hours,
                now.to_rfc3339(),
                parent_id.to_string(),
            ),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
