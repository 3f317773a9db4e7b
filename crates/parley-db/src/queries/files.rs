use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::FileRow;

pub fn insert_file(conn: &Connection, id: Uuid, uploader_id: Uuid, size: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO files (id, uploader_id, size, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.to_string(), uploader_id.to_string(), size, clock::now_millis()],
    )?;
    Ok(())
}

pub fn get_file(conn: &Connection, id: Uuid) -> Result<Option<FileRow>> {
    conn.query_row(
        "SELECT id, uploader_id, size, created_at FROM files WHERE id = ?1",
        [id.to_string()],
        FileRow::from_row,
    )
    .optional()
}
