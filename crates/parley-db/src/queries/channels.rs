use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::{CHANNEL_COLUMNS, ChannelRow};

pub fn insert_channel(conn: &Connection, id: Uuid, workspace_id: Uuid, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO channels (id, workspace_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.to_string(), workspace_id.to_string(), name, clock::now_millis()],
    )?;
    Ok(())
}

pub fn get_channel(conn: &Connection, id: Uuid) -> Result<Option<ChannelRow>> {
    let sql = format!("SELECT {} FROM channels WHERE id = ?1", CHANNEL_COLUMNS);
    conn.query_row(&sql, [id.to_string()], ChannelRow::from_row).optional()
}

pub fn list_channels(conn: &Connection, workspace_id: Uuid) -> Result<Vec<ChannelRow>> {
    let sql = format!(
        "SELECT {} FROM channels WHERE workspace_id = ?1 ORDER BY created_at ASC",
        CHANNEL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([workspace_id.to_string()], ChannelRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn rename_channel(conn: &Connection, id: Uuid, name: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE channels SET name = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), name],
    )?;
    Ok(changed > 0)
}

/// Deletes the channel row only; its messages keep their channel id.
pub fn delete_channel(conn: &Connection, id: Uuid) -> Result<bool> {
    let changed = conn.execute("DELETE FROM channels WHERE id = ?1", [id.to_string()])?;
    Ok(changed > 0)
}
