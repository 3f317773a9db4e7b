use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parley_db::Connection;
use parley_db::clock;
use parley_db::models::{MemberRow, MessageRow};
use parley_db::queries::messages::{self, MessageCursor, MessageScope};
use parley_db::queries::{channels, conversations, reactions};
use parley_types::models::{MessageView, Page, PageStatus};
use tracing::debug;
use uuid::Uuid;

use crate::assemble::assemble_messages;
use crate::guard::{Capability, authorize, ensure_participant};
use crate::{Actor, Core, CoreError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub workspace_id: Uuid,
    pub channel_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub parent_message_id: Option<Uuid>,
    pub body: String,
    /// Blob storage id of an attachment.
    pub image: Option<String>,
}

/// Which feed to list. A thread listing may name only its parent, in which
/// case the parent's channel or conversation is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFeed {
    pub channel_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub parent_message_id: Option<Uuid>,
}

/// Identity and placement of a message a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub channel_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub parent_message_id: Option<Uuid>,
    /// The two members of the message's conversation, if it has one.
    pub participants: Option<[Uuid; 2]>,
}

impl MessageRef {
    fn load(conn: &Connection, row: &MessageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            workspace_id: row.workspace_id,
            channel_id: row.channel_id,
            conversation_id: row.conversation_id,
            parent_message_id: row.parent_message_id,
            participants: participants_of(conn, row)?,
        })
    }
}

pub fn encode_cursor(cursor: &MessageCursor) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}", cursor.created_at, cursor.id))
}

pub fn decode_cursor(raw: &str) -> Result<MessageCursor> {
    let invalid = || CoreError::Validation("invalid cursor".into());

    let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (created_at, id) = text.split_once(':').ok_or_else(invalid)?;

    Ok(MessageCursor {
        created_at: created_at.parse().map_err(|_| invalid())?,
        id: id.parse().map_err(|_| invalid())?,
    })
}

fn scope_of(row: &MessageRow) -> Result<MessageScope> {
    match (row.channel_id, row.conversation_id) {
        (Some(channel_id), None) => Ok(MessageScope::Channel(channel_id)),
        (None, Some(conversation_id)) => Ok(MessageScope::Conversation(conversation_id)),
        _ => Err(anyhow!("message {} has no single scope", row.id).into()),
    }
}

/// Authorize the actor for a feed: membership in the feed's workspace, and
/// for conversations, being one of its two members.
fn open_feed(conn: &Connection, actor: Actor, scope: MessageScope) -> Result<MemberRow> {
    match scope {
        MessageScope::Channel(id) => {
            let channel = channels::get_channel(conn, id)?.ok_or(CoreError::NotFound("channel"))?;
            authorize(conn, actor, channel.workspace_id, Capability::Participate)
        }
        MessageScope::Conversation(id) => {
            let conversation = conversations::get_conversation(conn, id)?
                .ok_or(CoreError::NotFound("conversation"))?;
            let member = authorize(conn, actor, conversation.workspace_id, Capability::Participate)?;
            ensure_participant(&member, &conversation)?;
            Ok(member)
        }
    }
}

/// Check that a member may read (and react to) an existing message.
pub(crate) fn ensure_can_read(conn: &Connection, member: &MemberRow, row: &MessageRow) -> Result<()> {
    if let Some(conversation_id) = row.conversation_id {
        let conversation = conversations::get_conversation(conn, conversation_id)?
            .ok_or(CoreError::NotFound("conversation"))?;
        ensure_participant(member, &conversation)?;
    }
    Ok(())
}

/// Member ids allowed to see a message: `None` for channel messages, the
/// pair for conversation messages.
pub(crate) fn participants_of(conn: &Connection, row: &MessageRow) -> Result<Option<[Uuid; 2]>> {
    let Some(conversation_id) = row.conversation_id else {
        return Ok(None);
    };
    let conversation = conversations::get_conversation(conn, conversation_id)?
        .ok_or(CoreError::NotFound("conversation"))?;
    Ok(Some([conversation.member_one_id, conversation.member_two_id]))
}

fn requested_scope(
    channel_id: Option<Uuid>,
    conversation_id: Option<Uuid>,
    parent: Option<&MessageRow>,
) -> Result<MessageScope> {
    match (channel_id, conversation_id, parent) {
        (Some(_), Some(_), _) => Err(CoreError::Validation(
            "a message belongs to a channel or a conversation, not both".into(),
        )),
        (Some(id), None, _) => Ok(MessageScope::Channel(id)),
        (None, Some(id), _) => Ok(MessageScope::Conversation(id)),
        (None, None, Some(parent)) => scope_of(parent),
        (None, None, None) => Err(CoreError::Validation(
            "a channel, conversation or parent message is required".into(),
        )),
    }
}

impl Core {
    /// Post a message as the actor. A reply without an explicit feed joins
    /// its parent's channel or conversation.
    pub fn create_message(&self, actor: Actor, new: NewMessage) -> Result<MessageRef> {
        let message_id = Uuid::new_v4();

        let (author_id, message) = self.db().transaction(|conn| {
            let member = authorize(conn, actor, new.workspace_id, Capability::Participate)?;

            let parent = match new.parent_message_id {
                Some(id) => Some(
                    messages::get_message(conn, id)?
                        .filter(|p| p.workspace_id == new.workspace_id)
                        .ok_or(CoreError::NotFound("message"))?,
                ),
                None => None,
            };

            let scope = requested_scope(new.channel_id, new.conversation_id, parent.as_ref())?;
            if let Some(parent) = &parent {
                if scope_of(parent)? != scope {
                    return Err(CoreError::Validation(
                        "a reply must stay in its parent's feed".into(),
                    ));
                }
            }

            let feed_member = open_feed(conn, actor, scope)?;
            if feed_member.workspace_id != new.workspace_id {
                return Err(CoreError::NotFound(match scope {
                    MessageScope::Channel(_) => "channel",
                    MessageScope::Conversation(_) => "conversation",
                }));
            }

            let (channel_id, conversation_id) = match scope {
                MessageScope::Channel(id) => (Some(id), None),
                MessageScope::Conversation(id) => (None, Some(id)),
            };
            let row = MessageRow {
                id: message_id,
                workspace_id: new.workspace_id,
                channel_id,
                conversation_id,
                parent_message_id: new.parent_message_id,
                member_id: member.id,
                body: new.body,
                image: new.image,
                created_at: clock::now_millis(),
                updated_at: None,
            };
            messages::insert_message(conn, &row)?;
            let message = MessageRef::load(conn, &row)?;
            Ok::<_, CoreError>((row.member_id, message))
        })?;

        debug!("Message {} posted by member {}", message.id, author_id);
        Ok(message)
    }

    /// Replace the body of the actor's own message and stamp `updated_at`.
    pub fn update_message(&self, actor: Actor, id: Uuid, body: &str) -> Result<MessageRef> {
        self.db().transaction(|conn| {
            let row = messages::get_message(conn, id)?.ok_or(CoreError::NotFound("message"))?;
            authorize(
                conn,
                actor,
                row.workspace_id,
                Capability::EditMessage { author_id: row.member_id },
            )?;
            messages::update_message_body(conn, id, body, clock::now_millis())?;
            MessageRef::load(conn, &row)
        })
    }

    /// Hard-delete the actor's own message and its reactions. Thread replies
    /// are kept and keep pointing at the removed parent.
    pub fn remove_message(&self, actor: Actor, id: Uuid) -> Result<MessageRef> {
        self.db().transaction(|conn| {
            let row = messages::get_message(conn, id)?.ok_or(CoreError::NotFound("message"))?;
            authorize(
                conn,
                actor,
                row.workspace_id,
                Capability::EditMessage { author_id: row.member_id },
            )?;
            let message = MessageRef::load(conn, &row)?;
            reactions::delete_reactions_for_message(conn, id)?;
            messages::delete_message(conn, id)?;
            Ok(message)
        })
    }

    /// Newest-first page of a feed. `cursor` is the `continue_cursor` of the
    /// previous page; `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn list_messages(
        &self,
        actor: Actor,
        feed: MessageFeed,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<MessageView>> {
        let before = cursor.map(decode_cursor).transpose()?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        self.db().with_conn(|conn| {
            let parent = match (feed.channel_id, feed.conversation_id, feed.parent_message_id) {
                (None, None, Some(id)) => {
                    Some(messages::get_message(conn, id)?.ok_or(CoreError::NotFound("message"))?)
                }
                _ => None,
            };
            let scope = requested_scope(feed.channel_id, feed.conversation_id, parent.as_ref())?;
            open_feed(conn, actor, scope)?;

            let mut rows =
                messages::list_messages(conn, scope, feed.parent_message_id, before, limit + 1)?;
            let has_more = rows.len() > limit as usize;
            rows.truncate(limit as usize);

            let continue_cursor = if has_more {
                rows.last().map(|row| encode_cursor(&MessageCursor::from(row)))
            } else {
                None
            };
            let status = if has_more {
                PageStatus::CanLoadMore
            } else {
                PageStatus::Exhausted
            };

            Ok(Page {
                page: assemble_messages(conn, rows, self.blobs())?,
                status,
                continue_cursor,
            })
        })
    }

    /// One enriched message, or `None` when the message or its author is gone.
    pub fn get_message(&self, actor: Actor, id: Uuid) -> Result<Option<MessageView>> {
        self.db().with_conn(|conn| {
            let Some(row) = messages::get_message(conn, id)? else {
                return Ok(None);
            };
            let member = authorize(conn, actor, row.workspace_id, Capability::Participate)?;
            match ensure_can_read(conn, &member, &row) {
                Ok(()) => {}
                Err(CoreError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            }

            Ok(assemble_messages(conn, vec![row], self.blobs())?.pop())
        })
    }
}
