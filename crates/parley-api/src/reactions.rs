use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use parley_core::Actor;
use parley_types::api::{IdResponse, ToggleReactionRequest};
use parley_types::events::GatewayEvent;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;

/// POST /messages/{message_id}/reactions: adds the reaction, or removes it
/// if the caller already reacted with the same value. Returns the row id.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(message_id): Path<Uuid>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse> {
    let toggle = state
        .run(move |core| core.toggle_reaction(actor, message_id, &req.value))
        .await?;

    state.dispatcher.publish(GatewayEvent::ReactionToggled {
        workspace_id: toggle.workspace_id,
        message_id,
        participants: toggle.participants,
    });
    Ok(Json(IdResponse {
        id: toggle.reaction_id,
    }))
}
