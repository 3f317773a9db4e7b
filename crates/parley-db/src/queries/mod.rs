//! Query functions over a borrowed connection. Callers pick the boundary:
//! `Database::with_conn` for reads, `Database::transaction` for mutations.

pub mod channels;
pub mod conversations;
pub mod files;
pub mod members;
pub mod messages;
pub mod reactions;
pub mod users;
pub mod workspaces;

use anyhow::Result;
use uuid::Uuid;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) fn opt_id(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}
