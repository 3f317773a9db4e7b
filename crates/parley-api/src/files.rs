use std::path::PathBuf;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use parley_core::{Actor, BlobStore, CoreError};
use parley_db::queries::files;
use parley_types::api::{UploadResponse, UploadUrlResponse};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// 50 MB upload limit for files
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Blob storage on local disk. Storage ids are uuids naming files inside
/// `dir`; they are served back at `<public_url>/files/<id>`.
pub struct LocalBlobStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    // Only uuids map to paths, so ids can never escape `dir`.
    fn path_for(&self, storage_id: &str) -> Option<PathBuf> {
        let id: Uuid = storage_id.parse().ok()?;
        Some(self.dir.join(id.to_string()))
    }

    pub async fn write(&self, id: Uuid, bytes: &[u8]) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(id.to_string()), bytes).await?;
        Ok(())
    }

    pub async fn read(&self, storage_id: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let Some(path) = self.path_for(storage_id) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl BlobStore for LocalBlobStore {
    fn upload_url(&self) -> String {
        format!("{}/files", self.public_url)
    }

    fn url(&self, storage_id: &str) -> Option<String> {
        self.path_for(storage_id)?;
        Some(format!("{}/files/{}", self.public_url, storage_id))
    }
}

/// POST /upload-url
pub async fn upload_url(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    actor.require()?;
    Ok(Json(UploadUrlResponse {
        url: state.blobs.upload_url(),
    }))
}

/// POST /files: raw bytes in, `{ storage_id, size }` out.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    bytes: Bytes,
) -> Result<impl IntoResponse> {
    let user_id = actor.require()?;

    if bytes.is_empty() {
        return Err(ApiError::validation("file is empty"));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge);
    }

    let id = Uuid::new_v4();
    let size = bytes.len() as i64;
    state.blobs.write(id, &bytes).await.map_err(|e| {
        error!("Failed to store blob {}: {}", id, e);
        ApiError::from(e)
    })?;

    state
        .run(move |core| {
            core.db()
                .transaction(|conn| files::insert_file(conn, id, user_id, size))
                .map_err(CoreError::from)
        })
        .await?;

    info!("Stored blob {} ({} bytes) for {}", id, size, user_id);
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            storage_id: id.to_string(),
            size: size as u64,
        }),
    ))
}

/// Whether `storage_id` names an uploaded blob.
pub async fn is_stored(state: &AppState, storage_id: &str) -> Result<bool> {
    let Ok(id) = storage_id.parse::<Uuid>() else {
        return Ok(false);
    };
    let known = state
        .run(move |core| {
            core.db()
                .with_conn(|conn| files::get_file(conn, id))
                .map_err(CoreError::from)
        })
        .await?;
    Ok(known.is_some())
}

/// GET /files/{storage_id}
pub async fn download_file(
    State(state): State<AppState>,
    Path(storage_id): Path<String>,
) -> Result<impl IntoResponse> {
    if !is_stored(&state, &storage_id).await? {
        return Err(ApiError::NotFound("file"));
    }

    let bytes = state
        .blobs
        .read(&storage_id)
        .await?
        .ok_or(ApiError::NotFound("file"))?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
