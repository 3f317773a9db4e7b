use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::{REACTION_COLUMNS, ReactionRow};

/// Toggle a reaction: removes if exists, inserts if not.
/// Returns (added, id): added=true means `id` was inserted, false means the
/// existing row `id` was removed. Run inside a transaction.
pub fn toggle_reaction(
    conn: &Connection,
    new_id: Uuid,
    workspace_id: Uuid,
    message_id: Uuid,
    member_id: Uuid,
    value: &str,
) -> Result<(bool, Uuid)> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM reactions WHERE message_id = ?1 AND member_id = ?2 AND value = ?3",
            rusqlite::params![message_id.to_string(), member_id.to_string(), value],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(existing_id) = existing {
        conn.execute("DELETE FROM reactions WHERE id = ?1", [&existing_id])?;
        Ok((false, existing_id.parse()?))
    } else {
        conn.execute(
            "INSERT INTO reactions (id, workspace_id, message_id, member_id, value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                new_id.to_string(),
                workspace_id.to_string(),
                message_id.to_string(),
                member_id.to_string(),
                value,
                clock::now_millis()
            ],
        )?;
        Ok((true, new_id))
    }
}

/// Batch-fetch reactions for a set of message IDs, oldest first.
pub fn reactions_for_messages(conn: &Connection, message_ids: &[Uuid]) -> Result<Vec<ReactionRow>> {
    if message_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} FROM reactions WHERE message_id IN ({}) ORDER BY created_at ASC, id ASC",
        REACTION_COLUMNS,
        placeholders.join(", ")
    );

    let ids: Vec<String> = message_ids.iter().map(|id| id.to_string()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), ReactionRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn delete_reactions_for_message(conn: &Connection, message_id: Uuid) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM reactions WHERE message_id = ?1",
        [message_id.to_string()],
    )?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn toggle_twice_leaves_no_row() {
        let db = Database::open_in_memory().unwrap();
        let (ws, msg, member) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let (added, id) = db
            .transaction(|conn| toggle_reaction(conn, Uuid::new_v4(), ws, msg, member, "👍"))
            .unwrap();
        assert!(added);

        let (added, removed_id) = db
            .transaction(|conn| toggle_reaction(conn, Uuid::new_v4(), ws, msg, member, "👍"))
            .unwrap();
        assert!(!added);
        assert_eq!(removed_id, id);

        let rows = db.with_conn(|conn| reactions_for_messages(conn, &[msg])).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn duplicate_triple_is_rejected_by_the_store() {
        let db = Database::open_in_memory().unwrap();
        let insert = |id: Uuid| {
            db.with_conn(|conn| -> Result<usize> {
                Ok(conn.execute(
                    "INSERT INTO reactions (id, workspace_id, message_id, member_id, value, created_at)
                     VALUES (?1, 'w', 'm', 'a', 'x', 1)",
                    [id.to_string()],
                )?)
            })
        };
        assert!(insert(Uuid::new_v4()).is_ok());
        assert!(insert(Uuid::new_v4()).is_err());
    }
}
