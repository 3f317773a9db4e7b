use anyhow::{Result, anyhow};
use rusqlite::Connection;
use uuid::Uuid;

use super::OptionalExt;
use crate::clock;
use crate::models::{CONVERSATION_COLUMNS, ConversationRow};

/// Canonical storage order for an unordered member pair.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn get_conversation(conn: &Connection, id: Uuid) -> Result<Option<ConversationRow>> {
    let sql = format!("SELECT {} FROM conversations WHERE id = ?1", CONVERSATION_COLUMNS);
    conn.query_row(&sql, [id.to_string()], ConversationRow::from_row).optional()
}

/// Look up the conversation between two members, in either argument order.
pub fn find_conversation(
    conn: &Connection,
    workspace_id: Uuid,
    a: Uuid,
    b: Uuid,
) -> Result<Option<ConversationRow>> {
    let (one, two) = canonical_pair(a, b);
    let sql = format!(
        "SELECT {} FROM conversations
         WHERE workspace_id = ?1 AND member_one_id = ?2 AND member_two_id = ?3",
        CONVERSATION_COLUMNS
    );
    conn.query_row(
        &sql,
        [workspace_id.to_string(), one.to_string(), two.to_string()],
        ConversationRow::from_row,
    )
    .optional()
}

/// Conditionally insert the conversation for an unordered pair. The unique
/// index on (workspace, member_one, member_two) makes a losing concurrent
/// insert a no-op; either way the surviving row is returned.
/// The flag is `true` when this call created it.
pub fn insert_or_get_conversation(
    conn: &Connection,
    id: Uuid,
    workspace_id: Uuid,
    a: Uuid,
    b: Uuid,
) -> Result<(ConversationRow, bool)> {
    let (one, two) = canonical_pair(a, b);
    let inserted = conn.execute(
        "INSERT INTO conversations (id, workspace_id, member_one_id, member_two_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (workspace_id, member_one_id, member_two_id) DO NOTHING",
        rusqlite::params![
            id.to_string(),
            workspace_id.to_string(),
            one.to_string(),
            two.to_string(),
            clock::now_millis()
        ],
    )?;

    let row = find_conversation(conn, workspace_id, one, two)?
        .ok_or_else(|| anyhow!("conversation vanished after insert"))?;
    Ok((row, inserted > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn second_insert_for_a_pair_returns_the_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let (ws, ana, ben) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (first_id, second_id) = (Uuid::new_v4(), Uuid::new_v4());

        let (first, created) = db
            .transaction(|conn| insert_or_get_conversation(conn, first_id, ws, ana, ben))
            .unwrap();
        assert!(created);
        assert_eq!(first.id, first_id);

        let (second, created) = db
            .transaction(|conn| insert_or_get_conversation(conn, second_id, ws, ben, ana))
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first_id);
        assert_eq!(
            (second.member_one_id, second.member_two_id),
            canonical_pair(ana, ben)
        );

        let count: i64 = db
            .with_conn(|conn| -> Result<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn same_pair_in_another_workspace_is_a_new_conversation() {
        let db = Database::open_in_memory().unwrap();
        let (ana, ben) = (Uuid::new_v4(), Uuid::new_v4());

        let (_, created) = db
            .transaction(|conn| insert_or_get_conversation(conn, Uuid::new_v4(), Uuid::new_v4(), ana, ben))
            .unwrap();
        assert!(created);
        let (_, created) = db
            .transaction(|conn| insert_or_get_conversation(conn, Uuid::new_v4(), Uuid::new_v4(), ana, ben))
            .unwrap();
        assert!(created);
    }
}
