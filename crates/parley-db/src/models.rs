//! Database row types. These map directly to SQLite rows and stay distinct
//! from the parley-types views so the db layer remains independent.

use crate::clock;
use parley_types::models::Role;
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct WorkspaceRow {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub join_code: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct MemberRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub member_one_id: Uuid,
    pub member_two_id: Uuid,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub channel_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub parent_message_id: Option<Uuid>,
    pub member_id: Uuid,
    pub body: String,
    pub image: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub message_id: Uuid,
    pub member_id: Uuid,
    pub value: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub size: i64,
    pub created_at: i64,
}

pub(crate) const USER_COLUMNS: &str = "id, name, email, password, image, created_at";
pub(crate) const WORKSPACE_COLUMNS: &str = "id, name, user_id, join_code, created_at";
pub(crate) const MEMBER_COLUMNS: &str = "id, workspace_id, user_id, role, created_at";
pub(crate) const CHANNEL_COLUMNS: &str = "id, workspace_id, name, created_at";
pub(crate) const CONVERSATION_COLUMNS: &str =
    "id, workspace_id, member_one_id, member_two_id, created_at";
pub(crate) const MESSAGE_COLUMNS: &str = "id, workspace_id, channel_id, conversation_id, \
     parent_message_id, member_id, body, image, created_at, updated_at";
pub(crate) const REACTION_COLUMNS: &str = "id, workspace_id, message_id, member_id, value, created_at";

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            image: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl WorkspaceRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            user_id: uuid_at(row, 2)?,
            join_code: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl MemberRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let role: String = row.get(3)?;
        let role = Role::parse(&role).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown role '{}'", role).into(),
            )
        })?;

        Ok(Self {
            id: uuid_at(row, 0)?,
            workspace_id: uuid_at(row, 1)?,
            user_id: uuid_at(row, 2)?,
            role,
            created_at: row.get(4)?,
        })
    }
}

impl ChannelRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            workspace_id: uuid_at(row, 1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl ConversationRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            workspace_id: uuid_at(row, 1)?,
            member_one_id: uuid_at(row, 2)?,
            member_two_id: uuid_at(row, 3)?,
            created_at: row.get(4)?,
        })
    }
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            workspace_id: uuid_at(row, 1)?,
            channel_id: opt_uuid_at(row, 2)?,
            conversation_id: opt_uuid_at(row, 3)?,
            parent_message_id: opt_uuid_at(row, 4)?,
            member_id: uuid_at(row, 5)?,
            body: row.get(6)?,
            image: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl ReactionRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            workspace_id: uuid_at(row, 1)?,
            message_id: uuid_at(row, 2)?,
            member_id: uuid_at(row, 3)?,
            value: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FileRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            uploader_id: uuid_at(row, 1)?,
            size: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    raw.parse::<Uuid>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    parse_uuid(idx, &raw)
}

fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_uuid(idx, &s)).transpose()
}

// -- Conversions into shared views --

impl From<WorkspaceRow> for parley_types::models::Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            user_id: row.user_id,
            join_code: row.join_code,
            created_at: clock::to_datetime(row.created_at),
        }
    }
}

impl From<&MemberRow> for parley_types::models::Member {
    fn from(row: &MemberRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            user_id: row.user_id,
            role: row.role,
            created_at: clock::to_datetime(row.created_at),
        }
    }
}

impl From<UserRow> for parley_types::models::UserView {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            image: row.image,
        }
    }
}

impl From<ChannelRow> for parley_types::models::Channel {
    fn from(row: ChannelRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            name: row.name,
            created_at: clock::to_datetime(row.created_at),
        }
    }
}

impl From<ConversationRow> for parley_types::models::Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            member_one_id: row.member_one_id,
            member_two_id: row.member_two_id,
            created_at: clock::to_datetime(row.created_at),
        }
    }
}
