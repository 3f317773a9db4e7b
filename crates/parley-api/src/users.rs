use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use parley_core::Actor;
use parley_types::api::{IdResponse, UpdateProfileRequest};

use crate::error::{ApiError, Result};
use crate::state::AppState;

pub async fn current_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let user = state.run(move |core| core.current_user(actor)).await?;
    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    let name = req.name.map(|n| n.trim().to_string());
    if let Some(name) = &name {
        if !(3..=32).contains(&name.chars().count()) {
            return Err(ApiError::validation("name must be 3 to 32 characters"));
        }
    }

    let id = state
        .run(move |core| core.update_profile(actor, name.as_deref(), req.image.as_deref()))
        .await?;
    Ok(Json(IdResponse { id }))
}
