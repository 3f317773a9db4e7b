use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::{USER_COLUMNS, UserRow};

pub fn insert_user(
    conn: &Connection,
    id: Uuid,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), name, email, password_hash, clock::now_millis()],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: Uuid) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    conn.query_row(&sql, [id.to_string()], UserRow::from_row).optional()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
    conn.query_row(&sql, [email], UserRow::from_row).optional()
}

/// Patch profile fields; `None` leaves a field untouched.
pub fn update_profile(
    conn: &Connection,
    id: Uuid,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET name = COALESCE(?2, name), image = COALESCE(?3, image) WHERE id = ?1",
        rusqlite::params![id.to_string(), name, image],
    )?;
    Ok(changed > 0)
}
