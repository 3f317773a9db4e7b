use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::{WORKSPACE_COLUMNS, WorkspaceRow};

pub fn insert_workspace(
    conn: &Connection,
    id: Uuid,
    name: &str,
    user_id: Uuid,
    join_code: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO workspaces (id, name, user_id, join_code, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), name, user_id.to_string(), join_code, clock::now_millis()],
    )?;
    Ok(())
}

pub fn get_workspace(conn: &Connection, id: Uuid) -> Result<Option<WorkspaceRow>> {
    let sql = format!("SELECT {} FROM workspaces WHERE id = ?1", WORKSPACE_COLUMNS);
    conn.query_row(&sql, [id.to_string()], WorkspaceRow::from_row).optional()
}

/// Workspaces where the user holds a member row, oldest first.
pub fn list_workspaces_for_user(conn: &Connection, user_id: Uuid) -> Result<Vec<WorkspaceRow>> {
    let mut stmt = conn.prepare(
        "SELECT w.id, w.name, w.user_id, w.join_code, w.created_at
         FROM workspaces w
         JOIN members m ON m.workspace_id = w.id
         WHERE m.user_id = ?1
         ORDER BY w.created_at ASC",
    )?;

    let rows = stmt
        .query_map([user_id.to_string()], WorkspaceRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn rename_workspace(conn: &Connection, id: Uuid, name: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE workspaces SET name = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), name],
    )?;
    Ok(changed > 0)
}

pub fn set_join_code(conn: &Connection, id: Uuid, join_code: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE workspaces SET join_code = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), join_code],
    )?;
    Ok(changed > 0)
}

/// Delete the workspace and every row scoped to it. Run inside a
/// transaction; returns the number of dependent rows removed.
pub fn delete_workspace_cascade(conn: &Connection, id: Uuid) -> Result<usize> {
    let id = id.to_string();
    let mut removed = 0;

    for table in ["reactions", "messages", "conversations", "channels", "members"] {
        let sql = format!("DELETE FROM {} WHERE workspace_id = ?1", table);
        let n = conn.execute(&sql, [&id])?;
        debug!("Cascade removed {} rows from {}", n, table);
        removed += n;
    }

    conn.execute("DELETE FROM workspaces WHERE id = ?1", [&id])?;
    Ok(removed)
}
