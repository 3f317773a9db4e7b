use parley_db::queries::{conversations, members};
use parley_types::api::ConversationPeer;
use parley_types::models::Conversation;
use tracing::debug;
use uuid::Uuid;

use crate::guard::{Capability, authorize};
use crate::{Actor, Core, CoreError, Result};

impl Core {
    /// Find or create the conversation between the actor and `peer`.
    /// The pair is unordered: either side asking yields the same row.
    /// The flag is `true` when this call created the conversation.
    pub fn get_or_create_conversation(
        &self,
        actor: Actor,
        workspace_id: Uuid,
        peer: ConversationPeer,
    ) -> Result<(Conversation, bool)> {
        let candidate_id = Uuid::new_v4();

        let (row, created) = self.db().transaction(|conn| {
            let me = authorize(conn, actor, workspace_id, Capability::Participate)?;

            let other = match peer {
                ConversationPeer::MemberId(id) => members::get_member(conn, id)?
                    .filter(|m| m.workspace_id == workspace_id),
                ConversationPeer::UserId(user_id) => {
                    members::find_member(conn, workspace_id, user_id)?
                }
            }
            .ok_or(CoreError::NotFound("member"))?;

            if let Some(existing) =
                conversations::find_conversation(conn, workspace_id, me.id, other.id)?
            {
                return Ok((existing, false));
            }
            Ok::<_, CoreError>(conversations::insert_or_get_conversation(
                conn,
                candidate_id,
                workspace_id,
                me.id,
                other.id,
            )?)
        })?;

        if created {
            debug!("Conversation {} created in {}", row.id, workspace_id);
        }
        Ok((Conversation::from(row), created))
    }
}
