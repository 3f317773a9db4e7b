//! Authorization decisions. Every mutation and workspace-scoped read goes
//! through [`authorize`]; role and authorship rules live only in [`decide`].

use parley_db::Connection;
use parley_db::models::{ConversationRow, MemberRow};
use parley_db::queries::members;
use parley_types::models::Role;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// The authenticated caller, as resolved by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actor(Option<Uuid>);

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self(Some(user_id))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0
    }

    pub fn require(&self) -> Result<Uuid> {
        self.0.ok_or(CoreError::Unauthorized)
    }
}

impl From<Option<Uuid>> for Actor {
    fn from(user_id: Option<Uuid>) -> Self {
        Self(user_id)
    }
}

/// What the caller wants to do inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read feeds, post, react, open conversations.
    Participate,
    /// Workspace rename/delete, join-code rotation, channel lifecycle,
    /// role changes.
    Administer,
    /// Edit or delete a message written by `author_id`.
    EditMessage { author_id: Uuid },
    /// Remove `target_id` from the workspace. Admins may remove anyone,
    /// members only themselves.
    RemoveMember { target_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

pub fn decide(member: Option<&MemberRow>, capability: Capability) -> Decision {
    let Some(member) = member else {
        return Decision::Deny;
    };

    let allowed = match capability {
        Capability::Participate => true,
        Capability::Administer => member.role == Role::Admin,
        Capability::EditMessage { author_id } => member.id == author_id,
        Capability::RemoveMember { target_id } => {
            member.role == Role::Admin || member.id == target_id
        }
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

/// Resolve the actor's member row in `workspace_id` and check `capability`.
/// Returns the member row on success.
pub fn authorize(
    conn: &Connection,
    actor: Actor,
    workspace_id: Uuid,
    capability: Capability,
) -> Result<MemberRow> {
    let user_id = actor.require()?;
    let member = members::find_member(conn, workspace_id, user_id)?;

    match (decide(member.as_ref(), capability), member) {
        (Decision::Allow, Some(member)) => Ok(member),
        _ => {
            warn!(
                "Denied {:?} in workspace {} for user {}",
                capability, workspace_id, user_id
            );
            Err(CoreError::Unauthorized)
        }
    }
}

/// Direct conversations are visible only to their two members.
pub fn ensure_participant(member: &MemberRow, conversation: &ConversationRow) -> Result<()> {
    if conversation.workspace_id == member.workspace_id
        && (conversation.member_one_id == member.id || conversation.member_two_id == member.id)
    {
        Ok(())
    } else {
        warn!(
            "Member {} is not part of conversation {}",
            member.id, conversation.id
        );
        Err(CoreError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role) -> MemberRow {
        MemberRow {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            created_at: 0,
        }
    }

    #[test]
    fn non_members_are_denied_everything() {
        assert_eq!(decide(None, Capability::Participate), Decision::Deny);
        assert_eq!(decide(None, Capability::Administer), Decision::Deny);
    }

    #[test]
    fn admin_capabilities_need_admin_role() {
        let admin = member(Role::Admin);
        let plain = member(Role::Member);
        assert_eq!(decide(Some(&admin), Capability::Administer), Decision::Allow);
        assert_eq!(decide(Some(&plain), Capability::Administer), Decision::Deny);
        assert_eq!(decide(Some(&plain), Capability::Participate), Decision::Allow);
    }

    #[test]
    fn only_the_author_edits_a_message() {
        let admin = member(Role::Admin);
        let author = member(Role::Member);
        let cap = Capability::EditMessage { author_id: author.id };
        assert_eq!(decide(Some(&author), cap), Decision::Allow);
        assert_eq!(decide(Some(&admin), cap), Decision::Deny);
    }

    #[test]
    fn members_may_remove_only_themselves() {
        let admin = member(Role::Admin);
        let plain = member(Role::Member);
        let other = Uuid::new_v4();

        let leave = Capability::RemoveMember { target_id: plain.id };
        let kick = Capability::RemoveMember { target_id: other };
        assert_eq!(decide(Some(&plain), leave), Decision::Allow);
        assert_eq!(decide(Some(&plain), kick), Decision::Deny);
        assert_eq!(decide(Some(&admin), kick), Decision::Allow);
    }

    #[test]
    fn anonymous_actor_is_unauthorized() {
        assert!(matches!(
            Actor::anonymous().require(),
            Err(CoreError::Unauthorized)
        ));
    }
}
