use parley_db::queries::{channels, members};
use parley_types::models::Channel;
use tracing::info;
use uuid::Uuid;

use crate::guard::{Capability, authorize};
use crate::{Actor, Core, CoreError, Result};

// Names arrive already normalized (see `parley_types::api::normalize_channel_name`).

impl Core {
    pub fn create_channel(&self, actor: Actor, workspace_id: Uuid, name: &str) -> Result<Uuid> {
        let channel_id = Uuid::new_v4();
        self.db().transaction(|conn| {
            authorize(conn, actor, workspace_id, Capability::Administer)?;
            channels::insert_channel(conn, channel_id, workspace_id, name)?;
            Ok::<_, CoreError>(())
        })?;

        info!("Channel {} ({}) created in {}", name, channel_id, workspace_id);
        Ok(channel_id)
    }

    pub fn list_channels(&self, actor: Actor, workspace_id: Uuid) -> Result<Vec<Channel>> {
        self.db().with_conn(|conn| {
            authorize(conn, actor, workspace_id, Capability::Participate)?;
            let rows = channels::list_channels(conn, workspace_id)?;
            Ok(rows.into_iter().map(Channel::from).collect())
        })
    }

    /// The channel, or `None` when it is missing or the actor is not a
    /// member of its workspace.
    pub fn get_channel(&self, actor: Actor, id: Uuid) -> Result<Option<Channel>> {
        let Some(user_id) = actor.user_id() else {
            return Ok(None);
        };

        self.db().with_conn(|conn| {
            let Some(row) = channels::get_channel(conn, id)? else {
                return Ok(None);
            };
            if members::find_member(conn, row.workspace_id, user_id)?.is_none() {
                return Ok(None);
            }
            Ok(Some(Channel::from(row)))
        })
    }

    pub fn rename_channel(&self, actor: Actor, id: Uuid, name: &str) -> Result<Channel> {
        self.db().transaction(|conn| {
            let mut row = channels::get_channel(conn, id)?.ok_or(CoreError::NotFound("channel"))?;
            authorize(conn, actor, row.workspace_id, Capability::Administer)?;
            channels::rename_channel(conn, id, name)?;
            row.name = name.to_string();
            Ok(Channel::from(row))
        })
    }

    /// Delete a channel. Its messages are left in place.
    pub fn remove_channel(&self, actor: Actor, id: Uuid) -> Result<Channel> {
        let channel = self.db().transaction(|conn| {
            let row = channels::get_channel(conn, id)?.ok_or(CoreError::NotFound("channel"))?;
            authorize(conn, actor, row.workspace_id, Capability::Administer)?;
            channels::delete_channel(conn, id)?;
            Ok::<_, CoreError>(Channel::from(row))
        })?;

        info!("Channel {} removed from {}", channel.id, channel.workspace_id);
        Ok(channel)
    }
}
