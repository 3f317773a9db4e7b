use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_core::Actor;
use parley_types::api::{
    CreateWorkspaceRequest, IdResponse, JoinCodeResponse, JoinWorkspaceRequest, RenameRequest,
};
use parley_types::events::GatewayEvent;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;
use crate::validate;

pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<impl IntoResponse> {
    let name = validate::workspace_name(&req.name)?;
    let id = state.run(move |core| core.create_workspace(actor, &name)).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let workspaces = state.run(move |core| core.list_workspaces(actor)).await?;
    Ok(Json(workspaces))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let workspace = state.run(move |core| core.get_workspace(actor, id)).await?;
    Ok(Json(workspace))
}

/// Public summary used on the join screen.
pub async fn workspace_info(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let info = state.run(move |core| core.workspace_info(actor, id)).await?;
    Ok(Json(info))
}

pub async fn rename_workspace(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse> {
    let name = validate::workspace_name(&req.name)?;
    state
        .run(move |core| core.rename_workspace(actor, id, &name))
        .await?;

    state
        .dispatcher
        .publish(GatewayEvent::WorkspaceUpdated { workspace_id: id });
    Ok(Json(IdResponse { id }))
}

pub async fn rotate_join_code(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let join_code = state
        .run(move |core| core.rotate_join_code(actor, id))
        .await?;

    state
        .dispatcher
        .publish(GatewayEvent::WorkspaceUpdated { workspace_id: id });
    Ok(Json(JoinCodeResponse { join_code }))
}

pub async fn join_workspace(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<JoinWorkspaceRequest>,
) -> Result<impl IntoResponse> {
    let member_id = state
        .run(move |core| core.join_workspace(actor, id, req.join_code.trim()))
        .await?;

    state.dispatcher.publish(GatewayEvent::MemberJoined {
        workspace_id: id,
        member_id,
    });
    Ok((StatusCode::CREATED, Json(IdResponse { id: member_id })))
}

pub async fn remove_workspace(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.run(move |core| core.remove_workspace(actor, id)).await?;

    state
        .dispatcher
        .publish(GatewayEvent::WorkspaceRemoved { workspace_id: id });
    Ok(StatusCode::NO_CONTENT)
}
