use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::extract::{JsonBody, QueryParams};
use crate::error::ApiResult;
use crate::inbox;
use crate::models::{Caller, CreateThreadRequest, ThreadListQuery, ThreadViewQuery, UpdateThreadRequest};
use crate::store::threads::CreateOutcome;
use crate::AppState;

/// GET /api/{role}/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(inbox::threads::stats(&state, &caller).await?))
}

/// GET /api/{role}/threads
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    QueryParams(query): QueryParams<ThreadListQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(inbox::threads::list_threads(&state, &caller, &query).await?))
}

/// POST /api/{role}/threads
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    JsonBody(body): JsonBody<CreateThreadRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = match inbox::threads::create_thread(&state, &caller, body).await? {
        CreateOutcome::Created(thread) => (StatusCode::CREATED, Json(thread)),
        CreateOutcome::Existing(thread) => (StatusCode::OK, Json(thread)),
    };
    Ok(response)
}

/// GET /api/{role}/threads/{threadId}
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    QueryParams(query): QueryParams<ThreadViewQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::threads::view_thread(&state, &caller, &thread_id, &query).await?,
    ))
}

/// PUT /api/{role}/threads/{threadId}
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    JsonBody(body): JsonBody<UpdateThreadRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::threads::update_thread(&state, &caller, &thread_id, body).await?,
    ))
}

/// DELETE /api/{role}/threads/{threadId}
pub async fn archive_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        inbox::threads::archive_thread(&state, &caller, &thread_id).await?,
    ))
}

/// POST /api/{role}/threads/{threadId}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(inbox::threads::mark_read(&state, &caller, &thread_id).await?))
}
