use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::extract::{JsonBody, QueryParams, SendMessageForm};
use crate::error::ApiResult;
use crate::inbox;
use crate::models::{Caller, EditMessageRequest, ForwardRequest, MessageQuery, ReactRequest};
use crate::AppState;

/// GET /api/{role}/threads/{threadId}/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    QueryParams(query): QueryParams<MessageQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::messages::list_messages(&state, &caller, &thread_id, &query).await?,
    ))
}

/// POST /api/{role}/threads/{threadId}/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    form: SendMessageForm,
) -> ApiResult<impl IntoResponse> {
    let message =
        inbox::messages::send_message(&state, &caller, &thread_id, form.body, form.files).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /api/{role}/threads/{threadId}/messages/{messageId}
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<EditMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::messages::edit_message(&state, &caller, &thread_id, &message_id, &body.content)
            .await?,
    ))
}

/// DELETE /api/{role}/threads/{threadId}/messages/{messageId}
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::messages::delete_message(&state, &caller, &thread_id, &message_id).await?,
    ))
}

/// POST /api/{role}/threads/{threadId}/messages/{messageId}/react
pub async fn react(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<ReactRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::messages::react(&state, &caller, &thread_id, &message_id, &body.emoji).await?,
    ))
}

/// POST /api/{role}/threads/{threadId}/messages/{messageId}/forward
pub async fn forward(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<ForwardRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = inbox::messages::forward(
        &state,
        &caller,
        &thread_id,
        &message_id,
        &body.target_thread_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/{role}/threads/{threadId}/messages/{messageId}/read
pub async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::messages::mark_message_read(&state, &caller, &thread_id, &message_id).await?,
    ))
}
