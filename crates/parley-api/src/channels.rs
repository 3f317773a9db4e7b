use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_core::Actor;
use parley_types::api::{CreateChannelRequest, IdResponse, RenameRequest};
use parley_types::events::GatewayEvent;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;
use crate::validate;

pub async fn create_channel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse> {
    let name = validate::channel_name(&req.name)?;
    let channel_id = state
        .run(move |core| core.create_channel(actor, workspace_id, &name))
        .await?;

    state.dispatcher.publish(GatewayEvent::ChannelUpdated {
        workspace_id,
        channel_id,
    });
    Ok((StatusCode::CREATED, Json(IdResponse { id: channel_id })))
}

pub async fn list_channels(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(workspace_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let channels = state
        .run(move |core| core.list_channels(actor, workspace_id))
        .await?;
    Ok(Json(channels))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let channel = state.run(move |core| core.get_channel(actor, id)).await?;
    Ok(Json(channel))
}

pub async fn rename_channel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse> {
    let name = validate::channel_name(&req.name)?;
    let channel = state
        .run(move |core| core.rename_channel(actor, id, &name))
        .await?;

    state.dispatcher.publish(GatewayEvent::ChannelUpdated {
        workspace_id: channel.workspace_id,
        channel_id: channel.id,
    });
    Ok(Json(channel))
}

pub async fn remove_channel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let channel = state.run(move |core| core.remove_channel(actor, id)).await?;

    state.dispatcher.publish(GatewayEvent::ChannelRemoved {
        workspace_id: channel.workspace_id,
        channel_id: channel.id,
    });
    Ok(StatusCode::NO_CONTENT)
}
