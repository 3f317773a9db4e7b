use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::{OptionalExt, opt_id};
use crate::models::{MESSAGE_COLUMNS, MessageRow};

/// The feed a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageScope {
    Channel(Uuid),
    Conversation(Uuid),
}

impl MessageScope {
    fn column(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel_id",
            Self::Conversation(_) => "conversation_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            Self::Channel(id) | Self::Conversation(id) => *id,
        }
    }
}

/// Position in a newest-first listing: the last row of the previous page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCursor {
    pub created_at: i64,
    pub id: Uuid,
}

impl From<&MessageRow> for MessageCursor {
    fn from(row: &MessageRow) -> Self {
        Self {
            created_at: row.created_at,
            id: row.id,
        }
    }
}

/// Reply statistics for one thread root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadStats {
    pub count: usize,
    pub last_member_id: Uuid,
    pub last_created_at: i64,
}

pub fn insert_message(conn: &Connection, row: &MessageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, workspace_id, channel_id, conversation_id, parent_message_id,
                               member_id, body, image, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            row.id.to_string(),
            row.workspace_id.to_string(),
            opt_id(row.channel_id),
            opt_id(row.conversation_id),
            opt_id(row.parent_message_id),
            row.member_id.to_string(),
            row.body,
            row.image,
            row.created_at,
            row.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: Uuid) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    conn.query_row(&sql, [id.to_string()], MessageRow::from_row).optional()
}

pub fn update_message_body(conn: &Connection, id: Uuid, body: &str, updated_at: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE messages SET body = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id.to_string(), body, updated_at],
    )?;
    Ok(changed > 0)
}

pub fn delete_message(conn: &Connection, id: Uuid) -> Result<bool> {
    let changed = conn.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
    Ok(changed > 0)
}

/// Newest-first page of messages in `scope` whose parent equals `parent`
/// (`None` selects top-level messages). Rows strictly older than `before`
/// in (created_at, id) order.
pub fn list_messages(
    conn: &Connection,
    scope: MessageScope,
    parent: Option<Uuid>,
    before: Option<MessageCursor>,
    limit: u32,
) -> Result<Vec<MessageRow>> {
    let sql = format!(
        "SELECT {cols} FROM messages
         WHERE {col} = ?1
           AND parent_message_id IS ?2
           AND (?3 IS NULL OR created_at < ?3 OR (created_at = ?3 AND id < ?4))
         ORDER BY created_at DESC, id DESC
         LIMIT ?5",
        cols = MESSAGE_COLUMNS,
        col = scope.column(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                scope.id().to_string(),
                opt_id(parent),
                before.map(|c| c.created_at),
                before.map(|c| c.id.to_string()),
                limit,
            ],
            MessageRow::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Count and most recent reply of a thread, or `None` when it has no replies.
pub fn thread_stats(conn: &Connection, parent_id: Uuid) -> Result<Option<ThreadStats>> {
    let parent = parent_id.to_string();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE parent_message_id = ?1",
        [&parent],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Ok(None);
    }

    let sql = format!(
        "SELECT {} FROM messages WHERE parent_message_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT 1",
        MESSAGE_COLUMNS
    );
    let last = conn.query_row(&sql, [&parent], MessageRow::from_row).optional()?;

    Ok(last.map(|last| ThreadStats {
        count: count as usize,
        last_member_id: last.member_id,
        last_created_at: last.created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, clock};

    fn message(channel: Uuid, parent: Option<Uuid>) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            channel_id: Some(channel),
            conversation_id: None,
            parent_message_id: parent,
            member_id: Uuid::new_v4(),
            body: "hello".into(),
            image: None,
            created_at: clock::now_millis(),
            updated_at: None,
        }
    }

    #[test]
    fn list_pages_newest_first_without_overlap() {
        let db = Database::open_in_memory().unwrap();
        let channel = Uuid::new_v4();
        let rows: Vec<MessageRow> = (0..5).map(|_| message(channel, None)).collect();

        db.transaction(|conn| {
            for row in &rows {
                insert_message(conn, row)?;
            }
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();

        let scope = MessageScope::Channel(channel);
        let first: Vec<MessageRow> = db
            .with_conn(|conn| list_messages(conn, scope, None, None, 3))
            .unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].id, rows[4].id);

        let cursor = first.last().map(MessageCursor::from);
        let second: Vec<MessageRow> = db
            .with_conn(|conn| list_messages(conn, scope, None, cursor, 3))
            .unwrap();
        let ids: Vec<Uuid> = second.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![rows[1].id, rows[0].id]);
    }

    #[test]
    fn replies_are_excluded_from_feed_and_counted() {
        let db = Database::open_in_memory().unwrap();
        let channel = Uuid::new_v4();
        let root = message(channel, None);
        let reply_a = message(channel, Some(root.id));
        let reply_b = message(channel, Some(root.id));

        db.transaction(|conn| {
            insert_message(conn, &root)?;
            insert_message(conn, &reply_a)?;
            insert_message(conn, &reply_b)
        })
        .unwrap();

        let feed: Vec<MessageRow> = db
            .with_conn(|conn| list_messages(conn, MessageScope::Channel(channel), None, None, 10))
            .unwrap();
        assert_eq!(feed.len(), 1);

        let stats = db.with_conn(|conn| thread_stats(conn, root.id)).unwrap().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.last_member_id, reply_b.member_id);

        let none = db.with_conn(|conn| thread_stats(conn, reply_a.id)).unwrap();
        assert!(none.is_none());
    }
}
