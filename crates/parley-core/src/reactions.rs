use parley_db::queries::{messages, reactions};
use tracing::debug;
use uuid::Uuid;

use crate::guard::{Capability, authorize};
use crate::messages::{ensure_can_read, participants_of};
use crate::{Actor, Core, CoreError, Result};

/// Outcome of a toggle. `reaction_id` is the inserted row when `added`,
/// otherwise the row that was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionToggle {
    pub reaction_id: Uuid,
    pub message_id: Uuid,
    pub workspace_id: Uuid,
    pub added: bool,
    /// Conversation members when the message is a direct message.
    pub participants: Option<[Uuid; 2]>,
}

impl Core {
    pub fn toggle_reaction(&self, actor: Actor, message_id: Uuid, value: &str) -> Result<ReactionToggle> {
        if value.trim().is_empty() {
            return Err(CoreError::Validation("reaction value is required".into()));
        }

        let toggle = self.db().transaction(|conn| {
            let message =
                messages::get_message(conn, message_id)?.ok_or(CoreError::NotFound("message"))?;
            let member = authorize(conn, actor, message.workspace_id, Capability::Participate)?;
            ensure_can_read(conn, &member, &message)?;

            let (added, reaction_id) = reactions::toggle_reaction(
                conn,
                Uuid::new_v4(),
                message.workspace_id,
                message.id,
                member.id,
                value,
            )?;

            Ok::<_, CoreError>(ReactionToggle {
                reaction_id,
                message_id: message.id,
                workspace_id: message.workspace_id,
                added,
                participants: participants_of(conn, &message)?,
            })
        })?;

        debug!(
            "Reaction {} {} on message {}",
            value,
            if toggle.added { "added" } else { "removed" },
            message_id
        );
        Ok(toggle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use parley_types::api::ConversationPeer;

    use super::*;
    use crate::messages::{MessageFeed, NewMessage};
    use crate::testing;

    #[test]
    fn toggling_twice_restores_the_original_state() {
        let core = testing::core();
        let ana = testing::user(&core, "Ana");
        let ws = core.create_workspace(ana, "Acme").unwrap();
        let general = core.list_channels(ana, ws).unwrap()[0].id;
        let message = core
            .create_message(
                ana,
                NewMessage {
                    workspace_id: ws,
                    channel_id: Some(general),
                    conversation_id: None,
                    parent_message_id: None,
                    body: "ship it".into(),
                    image: None,
                },
            )
            .unwrap();

        let first = core.toggle_reaction(ana, message.id, "🎉").unwrap();
        assert!(first.added);
        let second = core.toggle_reaction(ana, message.id, "🎉").unwrap();
        assert!(!second.added);
        assert_eq!(first.reaction_id, second.reaction_id);

        let feed = MessageFeed {
            channel_id: Some(general),
            ..Default::default()
        };
        let page = core.list_messages(ana, feed, None, 10).unwrap();
        assert!(page.page[0].reactions.is_empty());
    }

    #[test]
    fn reactions_require_membership_and_a_message() {
        let core = testing::core();
        let ana = testing::user(&core, "Ana");
        let cy = testing::user(&core, "Cy");
        let ws = core.create_workspace(ana, "Acme").unwrap();
        let general = core.list_channels(ana, ws).unwrap()[0].id;
        let message = core
            .create_message(
                ana,
                NewMessage {
                    workspace_id: ws,
                    channel_id: Some(general),
                    conversation_id: None,
                    parent_message_id: None,
                    body: "hi".into(),
                    image: None,
                },
            )
            .unwrap();

        assert!(matches!(
            core.toggle_reaction(cy, message.id, "👍"),
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(
            core.toggle_reaction(ana, Uuid::new_v4(), "👍"),
            Err(CoreError::NotFound("message"))
        ));
        assert!(matches!(
            core.toggle_reaction(ana, message.id, "  "),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn concurrent_toggles_never_duplicate_a_reaction() {
        let core = Arc::new(testing::core());
        let ana = testing::user(&core, "Ana");
        let ws = core.create_workspace(ana, "Acme").unwrap();
        let general = core.list_channels(ana, ws).unwrap()[0].id;
        let message = core
            .create_message(
                ana,
                NewMessage {
                    workspace_id: ws,
                    channel_id: Some(general),
                    conversation_id: None,
                    parent_message_id: None,
                    body: "race".into(),
                    image: None,
                },
            )
            .unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let core = core.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    core.toggle_reaction(ana, message.id, "👍").unwrap()
                })
            })
            .collect();
        let toggles: Vec<ReactionToggle> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // One toggle adds, the other removes what it added.
        assert_eq!(toggles.iter().filter(|t| t.added).count(), 1);
        assert_eq!(toggles[0].reaction_id, toggles[1].reaction_id);

        let rows: i64 = core
            .db()
            .with_conn(|conn| -> anyhow::Result<i64> {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM reactions WHERE message_id = ?1",
                    [message.id.to_string()],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn direct_message_toggles_name_the_participants() {
        let core = testing::core();
        let ana = testing::user(&core, "Ana");
        let ben = testing::user(&core, "Ben");
        let ws = core.create_workspace(ana, "Acme").unwrap();
        let code = core.get_workspace(ana, ws).unwrap().unwrap().join_code;
        let ben_member = core.join_workspace(ben, ws, &code).unwrap();
        let (conversation, _) = core
            .get_or_create_conversation(ana, ws, ConversationPeer::MemberId(ben_member))
            .unwrap();
        let message = core
            .create_message(
                ana,
                NewMessage {
                    workspace_id: ws,
                    channel_id: None,
                    conversation_id: Some(conversation.id),
                    parent_message_id: None,
                    body: "psst".into(),
                    image: None,
                },
            )
            .unwrap();

        let toggle = core.toggle_reaction(ben, message.id, "👀").unwrap();
        assert_eq!(
            toggle.participants,
            Some([conversation.member_one_id, conversation.member_two_id])
        );
    }
}
