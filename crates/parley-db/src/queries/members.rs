use anyhow::Result;
use parley_types::models::Role;
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::{MEMBER_COLUMNS, MemberRow};

pub fn insert_member(
    conn: &Connection,
    id: Uuid,
    workspace_id: Uuid,
    user_id: Uuid,
    role: Role,
) -> Result<()> {
    conn.execute(
        "INSERT INTO members (id, workspace_id, user_id, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            id.to_string(),
            workspace_id.to_string(),
            user_id.to_string(),
            role.as_str(),
            clock::now_millis()
        ],
    )?;
    Ok(())
}

pub fn get_member(conn: &Connection, id: Uuid) -> Result<Option<MemberRow>> {
    let sql = format!("SELECT {} FROM members WHERE id = ?1", MEMBER_COLUMNS);
    conn.query_row(&sql, [id.to_string()], MemberRow::from_row).optional()
}

/// The unique member row for (workspace, user), if any.
pub fn find_member(conn: &Connection, workspace_id: Uuid, user_id: Uuid) -> Result<Option<MemberRow>> {
    let sql = format!(
        "SELECT {} FROM members WHERE workspace_id = ?1 AND user_id = ?2",
        MEMBER_COLUMNS
    );
    conn.query_row(
        &sql,
        [workspace_id.to_string(), user_id.to_string()],
        MemberRow::from_row,
    )
    .optional()
}

pub fn list_members(conn: &Connection, workspace_id: Uuid) -> Result<Vec<MemberRow>> {
    let sql = format!(
        "SELECT {} FROM members WHERE workspace_id = ?1 ORDER BY created_at ASC",
        MEMBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([workspace_id.to_string()], MemberRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_role(conn: &Connection, id: Uuid, role: Role) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE members SET role = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), role.as_str()],
    )?;
    Ok(changed > 0)
}

/// Remove a member together with their reactions, their messages, and the
/// conversations they take part in (plus everything posted in those).
/// Run inside a transaction.
pub fn delete_member_cascade(conn: &Connection, id: Uuid) -> Result<()> {
    let id = id.to_string();

    conn.execute(
        "DELETE FROM reactions
         WHERE member_id = ?1
            OR message_id IN (
                SELECT id FROM messages
                WHERE member_id = ?1
                   OR conversation_id IN (
                       SELECT id FROM conversations
                       WHERE member_one_id = ?1 OR member_two_id = ?1))",
        [&id],
    )?;
    conn.execute(
        "DELETE FROM messages
         WHERE member_id = ?1
            OR conversation_id IN (
                SELECT id FROM conversations
                WHERE member_one_id = ?1 OR member_two_id = ?1)",
        [&id],
    )?;
    conn.execute(
        "DELETE FROM conversations WHERE member_one_id = ?1 OR member_two_id = ?1",
        [&id],
    )?;
    conn.execute("DELETE FROM members WHERE id = ?1", [&id])?;

    Ok(())
}
