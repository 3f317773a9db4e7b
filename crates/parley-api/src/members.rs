use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use parley_core::Actor;
use parley_types::api::UpdateMemberRequest;
use parley_types::events::GatewayEvent;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;

pub async fn current_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(workspace_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let member = state
        .run(move |core| core.current_member(actor, workspace_id))
        .await?;
    Ok(Json(member))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(workspace_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let members = state
        .run(move |core| core.list_members(actor, workspace_id))
        .await?;
    Ok(Json(members))
}

pub async fn get_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let member = state
        .run(move |core| core.get_member(actor, member_id))
        .await?;
    Ok(Json(member))
}

pub async fn update_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(member_id): Path<Uuid>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<impl IntoResponse> {
    let member = state
        .run(move |core| core.update_member_role(actor, member_id, req.role))
        .await?;

    state.dispatcher.publish(GatewayEvent::MemberUpdated {
        workspace_id: member.workspace_id,
        member_id,
    });
    Ok(Json(member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let member = state
        .run(move |core| core.remove_member(actor, member_id))
        .await?;

    state.dispatcher.publish(GatewayEvent::MemberRemoved {
        workspace_id: member.workspace_id,
        member_id,
    });
    Ok(Json(member))
}
