use std::sync::Arc;

use parley_core::{Core, CoreError};
use parley_gateway::Dispatcher;
use tracing::error;

use crate::error::{ApiError, Result};
use crate::files::LocalBlobStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub core: Arc<Core>,
    pub dispatcher: Dispatcher,
    pub blobs: Arc<LocalBlobStore>,
    pub jwt_secret: String,
}

impl AppStateInner {
    /// Run a core call off the async runtime. SQLite access blocks.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Core) -> std::result::Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || f(&core))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.to_string())
            })?
            .map_err(ApiError::from)
    }
}
