//! Authorization and read-model layer for workspaces, channels, direct
//! conversations, threaded messages and reactions.
//!
//! Every operation takes the calling [`Actor`] first and runs as a single
//! [`Database::with_conn`] read or [`Database::transaction`] mutation.

pub mod assemble;
pub mod blob;
pub mod channels;
pub mod conversations;
pub mod error;
pub mod guard;
pub mod members;
pub mod messages;
pub mod reactions;
pub mod users;
pub mod workspaces;

use std::sync::Arc;

use parley_db::Database;

pub use blob::BlobStore;
pub use error::{CoreError, Result};
pub use guard::Actor;

pub struct Core {
    db: Arc<Database>,
    blobs: Arc<dyn BlobStore>,
}

impl Core {
    pub fn new(db: Arc<Database>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use parley_db::Database;
    use parley_db::queries::users;
    use uuid::Uuid;

    use crate::blob::PrefixBlobStore;
    use crate::{Actor, Core};

    pub fn core() -> Core {
        let db = Database::open_in_memory().unwrap();
        Core::new(
            Arc::new(db),
            Arc::new(PrefixBlobStore::new("http://files.test")),
        )
    }

    /// Insert a user row and return an actor signed in as them.
    pub fn user(core: &Core, name: &str) -> Actor {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", name.to_lowercase());
        core.db()
            .transaction(|conn| users::insert_user(conn, id, name, &email, "hash"))
            .unwrap();
        Actor::user(id)
    }
}
