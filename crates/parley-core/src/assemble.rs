//! Read-model assembly: joins message rows with their author, reaction
//! roll-up and thread summary.

use std::collections::HashMap;

use parley_db::Connection;
use parley_db::clock::to_datetime;
use parley_db::models::{MemberRow, MessageRow, ReactionRow, UserRow};
use parley_db::queries::{members, messages, reactions, users};
use parley_types::models::{Member, MessageView, ReactionGroup, UserView};
use tracing::warn;
use uuid::Uuid;

use crate::Result;
use crate::blob::BlobStore;

/// Group raw reaction rows by message, then by value. Groups keep the order
/// in which their value first appeared.
pub fn group_reactions(rows: &[ReactionRow]) -> HashMap<Uuid, Vec<ReactionGroup>> {
    let mut out: HashMap<Uuid, Vec<ReactionGroup>> = HashMap::new();

    for row in rows {
        let groups = out.entry(row.message_id).or_default();
        match groups.iter_mut().find(|g| g.value == row.value) {
            Some(group) => {
                if !group.member_ids.contains(&row.member_id) {
                    group.member_ids.push(row.member_id);
                    group.count = group.member_ids.len();
                }
            }
            None => groups.push(ReactionGroup {
                value: row.value.clone(),
                count: 1,
                member_ids: vec![row.member_id],
            }),
        }
    }

    out
}

/// Member -> user lookups memoized for the duration of one assembly.
struct Authors<'c> {
    conn: &'c Connection,
    cache: HashMap<Uuid, Option<(MemberRow, UserRow)>>,
}

impl<'c> Authors<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            cache: HashMap::new(),
        }
    }

    fn resolve(&mut self, member_id: Uuid) -> Result<Option<&(MemberRow, UserRow)>> {
        if !self.cache.contains_key(&member_id) {
            let found = match members::get_member(self.conn, member_id)? {
                Some(member) => users::get_user(self.conn, member.user_id)?.map(|u| (member, u)),
                None => None,
            };
            self.cache.insert(member_id, found);
        }
        Ok(self.cache.get(&member_id).and_then(|entry| entry.as_ref()))
    }
}

/// Enrich rows into views, preserving order. Rows whose author member or
/// user cannot be resolved are dropped.
pub fn assemble_messages(
    conn: &Connection,
    rows: Vec<MessageRow>,
    blobs: &dyn BlobStore,
) -> Result<Vec<MessageView>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut reaction_map = group_reactions(&reactions::reactions_for_messages(conn, &ids)?);
    let mut authors = Authors::new(conn);
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let Some((member, user)) = authors.resolve(row.member_id)?.cloned() else {
            warn!(
                "Dropping message {}: author {} cannot be resolved",
                row.id, row.member_id
            );
            continue;
        };

        let (thread_count, thread_timestamp, thread_name, thread_image) =
            match messages::thread_stats(conn, row.id)? {
                Some(stats) => {
                    let reply_author = authors.resolve(stats.last_member_id)?;
                    (
                        Some(stats.count),
                        Some(to_datetime(stats.last_created_at)),
                        reply_author.map(|(_, u)| u.name.clone()),
                        reply_author.and_then(|(_, u)| u.image.clone()),
                    )
                }
                None => (None, None, None, None),
            };

        out.push(MessageView {
            id: row.id,
            workspace_id: row.workspace_id,
            channel_id: row.channel_id,
            conversation_id: row.conversation_id,
            parent_message_id: row.parent_message_id,
            image: row.image.as_deref().and_then(|sid| blobs.url(sid)),
            body: row.body,
            created_at: to_datetime(row.created_at),
            updated_at: row.updated_at.map(to_datetime),
            member: Member::from(&member),
            user: UserView::from(user),
            reactions: reaction_map.remove(&row.id).unwrap_or_default(),
            thread_count,
            thread_timestamp,
            thread_name,
            thread_image,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(message_id: Uuid, member_id: Uuid, value: &str) -> ReactionRow {
        ReactionRow {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            message_id,
            member_id,
            value: value.into(),
            created_at: 0,
        }
    }

    #[test]
    fn reactions_roll_up_by_value() {
        let (msg, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            reaction(msg, a, "👍"),
            reaction(msg, b, "🎉"),
            reaction(msg, b, "👍"),
        ];

        let grouped = group_reactions(&rows);
        let groups = &grouped[&msg];
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].value, "👍");
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].member_ids, vec![a, b]);
        assert_eq!(groups[1].value, "🎉");
        assert_eq!(groups[1].count, 1);
    }

    #[test]
    fn reactions_stay_with_their_message() {
        let (m1, m2, a) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let grouped = group_reactions(&[reaction(m1, a, "x"), reaction(m2, a, "x")]);
        assert_eq!(grouped[&m1].len(), 1);
        assert_eq!(grouped[&m2].len(), 1);
    }
}
