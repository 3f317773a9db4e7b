use parley_db::queries::{channels, members, workspaces};
use parley_types::models::{Role, Workspace, WorkspaceInfo};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::guard::{Capability, authorize};
use crate::{Actor, Core, CoreError, Result};

pub const JOIN_CODE_LEN: usize = 6;
const JOIN_CODE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Channel created with every new workspace.
pub const DEFAULT_CHANNEL: &str = "general";

/// Six lowercase base-36 characters.
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

impl Core {
    /// Create a workspace with the actor as its admin and a `general` channel.
    pub fn create_workspace(&self, actor: Actor, name: &str) -> Result<Uuid> {
        let user_id = actor.require()?;
        let workspace_id = Uuid::new_v4();
        let join_code = generate_join_code();

        self.db().transaction(|conn| {
            workspaces::insert_workspace(conn, workspace_id, name, user_id, &join_code)?;
            members::insert_member(conn, Uuid::new_v4(), workspace_id, user_id, Role::Admin)?;
            channels::insert_channel(conn, Uuid::new_v4(), workspace_id, DEFAULT_CHANNEL)?;
            Ok::<_, CoreError>(())
        })?;

        info!("Workspace {} created by {}", workspace_id, user_id);
        Ok(workspace_id)
    }

    /// Workspaces the actor belongs to. Anonymous callers get an empty list.
    pub fn list_workspaces(&self, actor: Actor) -> Result<Vec<Workspace>> {
        let Some(user_id) = actor.user_id() else {
            return Ok(vec![]);
        };

        let rows = self
            .db()
            .with_conn(|conn| workspaces::list_workspaces_for_user(conn, user_id))?;
        Ok(rows.into_iter().map(Workspace::from).collect())
    }

    /// The workspace, if the actor is one of its members.
    pub fn get_workspace(&self, actor: Actor, id: Uuid) -> Result<Option<Workspace>> {
        let Some(user_id) = actor.user_id() else {
            return Ok(None);
        };

        self.db().with_conn(|conn| {
            if members::find_member(conn, id, user_id)?.is_none() {
                return Ok(None);
            }
            Ok(workspaces::get_workspace(conn, id)?.map(Workspace::from))
        })
    }

    /// Join-page preview. Needs a signed-in actor but no membership.
    pub fn workspace_info(&self, actor: Actor, id: Uuid) -> Result<Option<WorkspaceInfo>> {
        let Some(user_id) = actor.user_id() else {
            return Ok(None);
        };

        self.db().with_conn(|conn| {
            let Some(workspace) = workspaces::get_workspace(conn, id)? else {
                return Ok(None);
            };
            let is_member = members::find_member(conn, id, user_id)?.is_some();
            Ok(Some(WorkspaceInfo {
                name: workspace.name,
                is_member,
            }))
        })
    }

    pub fn rename_workspace(&self, actor: Actor, id: Uuid, name: &str) -> Result<()> {
        self.db().transaction(|conn| {
            authorize(conn, actor, id, Capability::Administer)?;
            if !workspaces::rename_workspace(conn, id, name)? {
                return Err(CoreError::NotFound("workspace"));
            }
            Ok(())
        })
    }

    /// Replace the join code. The old code stops working immediately.
    pub fn rotate_join_code(&self, actor: Actor, id: Uuid) -> Result<String> {
        let join_code = generate_join_code();
        self.db().transaction(|conn| {
            if workspaces::get_workspace(conn, id)?.is_none() {
                return Err(CoreError::NotFound("workspace"));
            }
            authorize(conn, actor, id, Capability::Administer)?;
            workspaces::set_join_code(conn, id, &join_code)?;
            Ok(())
        })?;

        info!("Join code rotated for workspace {}", id);
        Ok(join_code)
    }

    /// Join with a code (compared case-insensitively). Returns the new
    /// member id.
    pub fn join_workspace(&self, actor: Actor, id: Uuid, code: &str) -> Result<Uuid> {
        let user_id = actor.require()?;
        let member_id = Uuid::new_v4();

        self.db().transaction(|conn| {
            let workspace =
                workspaces::get_workspace(conn, id)?.ok_or(CoreError::NotFound("workspace"))?;
            if members::find_member(conn, id, user_id)?.is_some() {
                return Err(CoreError::AlreadyMember);
            }
            if workspace.join_code != code.to_lowercase() {
                return Err(CoreError::InvalidCode);
            }
            members::insert_member(conn, member_id, id, user_id, Role::Member)?;
            Ok(())
        })?;

        info!("User {} joined workspace {}", user_id, id);
        Ok(member_id)
    }

    /// Delete the workspace and everything scoped to it, atomically.
    pub fn remove_workspace(&self, actor: Actor, id: Uuid) -> Result<()> {
        let removed = self.db().transaction(|conn| {
            authorize(conn, actor, id, Capability::Administer)?;
            Ok::<_, CoreError>(workspaces::delete_workspace_cascade(conn, id)?)
        })?;

        info!("Workspace {} removed with {} dependent rows", id, removed);
        Ok(())
    }
}
