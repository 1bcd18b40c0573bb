use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use inbox_shared::attachment::is_inline_safe;

use super::extract::MultipartForm;
use crate::error::ApiResult;
use crate::inbox;
use crate::models::{AuthUser, Caller};
use crate::AppState;

/// POST /api/{role}/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    form: MultipartForm,
) -> ApiResult<impl IntoResponse> {
    let attachments = inbox::messages::upload(&state, &caller, form.files).await?;
    Ok(Json(serde_json::json!({ "attachments": attachments })))
}

/// GET /api/files/{attachmentId}
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(attachment_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let attachment = inbox::uploads::find_for_download(&state, &user.id, &attachment_id).await?;
    let reader = state.blobs.open(&attachment.path).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    // Anything a browser could execute as a document is forced to download.
    let disposition = if is_inline_safe(&attachment.mime_type) {
        "inline".to_string()
    } else {
        let name: String = attachment
            .original_name
            .chars()
            .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
            .collect();
        format!("attachment; filename=\"{}\"", name)
    };

    Ok((
        [
            (header::CONTENT_TYPE, attachment.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        body,
    ))
}
