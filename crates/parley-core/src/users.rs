use parley_db::queries::users;
use parley_types::models::UserView;
use uuid::Uuid;

use crate::{Actor, Core, CoreError, Result};

impl Core {
    /// The signed-in user's profile, or `None` for anonymous callers.
    pub fn current_user(&self, actor: Actor) -> Result<Option<UserView>> {
        let Some(user_id) = actor.user_id() else {
            return Ok(None);
        };
        let row = self.db().with_conn(|conn| users::get_user(conn, user_id))?;
        Ok(row.map(UserView::from))
    }

    /// Patch profile fields of the signed-in user.
    pub fn update_profile(
        &self,
        actor: Actor,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<Uuid> {
        let user_id = actor.require()?;
        self.db().transaction(|conn| {
            if !users::update_profile(conn, user_id, name, image)? {
                return Err(CoreError::NotFound("user"));
            }
            Ok(user_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn profile_updates_are_partial() {
        let core = testing::core();
        let ana = testing::user(&core, "Ana");

        core.update_profile(ana, None, Some("http://img.test/ana.png")).unwrap();
        let me = core.current_user(ana).unwrap().unwrap();
        assert_eq!(me.name, "Ana");
        assert_eq!(me.image.as_deref(), Some("http://img.test/ana.png"));

        assert!(core.current_user(Actor::anonymous()).unwrap().is_none());
    }

    #[test]
    fn unknown_user_cannot_update() {
        let core = testing::core();
        let ghost = Actor::user(Uuid::new_v4());
        assert!(matches!(
            core.update_profile(ghost, Some("Boo"), None),
            Err(CoreError::NotFound("user"))
        ));
    }
}
