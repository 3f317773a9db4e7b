use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_core::Actor;
use parley_types::api::ConversationPeer;
use parley_types::events::GatewayEvent;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;

/// POST /workspaces/{id}/conversations with `{"member_id": ..}` or
/// `{"user_id": ..}`. 201 when the conversation is new, 200 otherwise.
pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(workspace_id): Path<Uuid>,
    Json(peer): Json<ConversationPeer>,
) -> Result<impl IntoResponse> {
    let (conversation, created) = state
        .run(move |core| core.get_or_create_conversation(actor, workspace_id, peer))
        .await?;

    if created {
        state.dispatcher.publish(GatewayEvent::ConversationCreated {
            workspace_id,
            conversation_id: conversation.id,
            participants: [conversation.member_one_id, conversation.member_two_id],
        });
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(conversation)))
}
