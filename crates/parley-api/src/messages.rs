use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_core::Actor;
use parley_core::messages::{DEFAULT_PAGE_SIZE, MessageFeed, NewMessage};
use parley_types::api::{CreateMessageRequest, IdResponse, ListMessagesQuery, UpdateMessageRequest};
use parley_types::events::GatewayEvent;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::files;
use crate::state::AppState;
use crate::validate;

pub async fn create_message(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse> {
    validate::message_body(&req.body, req.image.is_some())?;
    if let Some(image) = &req.image {
        if !files::is_stored(&state, image).await? {
            return Err(ApiError::validation("image must reference an uploaded file"));
        }
    }

    let new = NewMessage {
        workspace_id: req.workspace_id,
        channel_id: req.channel_id,
        conversation_id: req.conversation_id,
        parent_message_id: req.parent_message_id,
        body: req.body,
        image: req.image,
    };
    let message = state.run(move |core| core.create_message(actor, new)).await?;

    state.dispatcher.publish(GatewayEvent::MessageCreated {
        workspace_id: message.workspace_id,
        message_id: message.id,
        channel_id: message.channel_id,
        conversation_id: message.conversation_id,
        parent_message_id: message.parent_message_id,
        participants: message.participants,
    });
    Ok((StatusCode::CREATED, Json(IdResponse { id: message.id })))
}

/// GET /messages?channel_id=..|conversation_id=..[&parent_message_id=..]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<impl IntoResponse> {
    let feed = MessageFeed {
        channel_id: query.channel_id,
        conversation_id: query.conversation_id,
        parent_message_id: query.parent_message_id,
    };
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let page = state
        .run(move |core| core.list_messages(actor, feed, query.cursor.as_deref(), limit))
        .await?;
    Ok(Json(page))
}

pub async fn get_message(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let message = state.run(move |core| core.get_message(actor, id)).await?;
    Ok(Json(message))
}

pub async fn update_message(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMessageRequest>,
) -> Result<impl IntoResponse> {
    validate::message_body(&req.body, false)?;
    let message = state
        .run(move |core| core.update_message(actor, id, &req.body))
        .await?;

    state.dispatcher.publish(GatewayEvent::MessageUpdated {
        workspace_id: message.workspace_id,
        message_id: id,
        participants: message.participants,
    });
    Ok(Json(IdResponse { id }))
}

pub async fn remove_message(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let message = state.run(move |core| core.remove_message(actor, id)).await?;

    state.dispatcher.publish(GatewayEvent::MessageRemoved {
        workspace_id: message.workspace_id,
        message_id: id,
        participants: message.participants,
    });
    Ok(Json(IdResponse { id }))
}
