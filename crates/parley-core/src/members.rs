use parley_db::queries::{members, users};
use parley_types::models::{Member, MemberWithUser, Role, UserView};
use tracing::{info, warn};
use uuid::Uuid;

use crate::guard::{Capability, authorize};
use crate::{Actor, Core, CoreError, Result};

impl Core {
    /// The actor's own member row in a workspace, if any.
    pub fn current_member(&self, actor: Actor, workspace_id: Uuid) -> Result<Option<Member>> {
        let Some(user_id) = actor.user_id() else {
            return Ok(None);
        };

        let row = self
            .db()
            .with_conn(|conn| members::find_member(conn, workspace_id, user_id))?;
        Ok(row.as_ref().map(Member::from))
    }

    /// All members with their profiles. Members whose user is gone are skipped.
    pub fn list_members(&self, actor: Actor, workspace_id: Uuid) -> Result<Vec<MemberWithUser>> {
        self.db().with_conn(|conn| {
            authorize(conn, actor, workspace_id, Capability::Participate)?;

            let mut out = Vec::new();
            for row in members::list_members(conn, workspace_id)? {
                match users::get_user(conn, row.user_id)? {
                    Some(user) => out.push(MemberWithUser {
                        member: Member::from(&row),
                        user: UserView::from(user),
                    }),
                    None => warn!("Member {} has no user {}", row.id, row.user_id),
                }
            }
            Ok(out)
        })
    }

    pub fn get_member(&self, actor: Actor, member_id: Uuid) -> Result<Option<MemberWithUser>> {
        self.db().with_conn(|conn| {
            let Some(row) = members::get_member(conn, member_id)? else {
                return Ok(None);
            };
            authorize(conn, actor, row.workspace_id, Capability::Participate)?;

            let Some(user) = users::get_user(conn, row.user_id)? else {
                return Ok(None);
            };
            Ok(Some(MemberWithUser {
                member: Member::from(&row),
                user: UserView::from(user),
            }))
        })
    }

    /// Change a member's role. Admin only.
    pub fn update_member_role(&self, actor: Actor, member_id: Uuid, role: Role) -> Result<Member> {
        let member = self.db().transaction(|conn| {
            let mut row = members::get_member(conn, member_id)?.ok_or(CoreError::NotFound("member"))?;
            authorize(conn, actor, row.workspace_id, Capability::Administer)?;
            members::update_role(conn, member_id, role)?;
            row.role = role;
            Ok::<_, CoreError>(Member::from(&row))
        })?;

        info!("Member {} is now {}", member_id, role.as_str());
        Ok(member)
    }

    /// Remove a member: admins may remove anyone, members may leave.
    /// Their messages, reactions and conversations go with them.
    pub fn remove_member(&self, actor: Actor, member_id: Uuid) -> Result<Member> {
        let member = self.db().transaction(|conn| {
            let row = members::get_member(conn, member_id)?.ok_or(CoreError::NotFound("member"))?;
            authorize(
                conn,
                actor,
                row.workspace_id,
                Capability::RemoveMember { target_id: row.id },
            )?;
            members::delete_member_cascade(conn, row.id)?;
            Ok::<_, CoreError>(Member::from(&row))
        })?;

        info!("Member {} removed from workspace {}", member.id, member.workspace_id);
        Ok(member)
    }
}
