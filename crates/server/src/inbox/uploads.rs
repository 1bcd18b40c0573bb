use axum::body::Bytes;
use uuid::Uuid;

use inbox_shared::attachment::{extension, normalize, normalize_duration, NormalizedFile};
use inbox_shared::constants::MAX_FILENAME_LENGTH;

use crate::config::Config;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Attachment, AttachmentType};
use crate::store;
use crate::AppState;

/// A file received in a multipart body, not yet stored.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub data: Bytes,
    pub duration: Option<f64>,
}

/// Reject files with an unknown or inconsistent type, or over the size limit, naming the
/// file. Returns the kind and MIME type the file is stored as.
pub fn check_file(config: &Config, file: &IncomingFile) -> ApiResult<NormalizedFile> {
    let normalized = normalize(&file.original_name, &file.mime_type).ok_or_else(|| {
        ApiError::invalid_field(
            "attachments",
            format!("File type not allowed: {}", file.original_name),
        )
    })?;
    if file.data.len() as u64 > config.max_upload_bytes {
        return Err(ApiError::invalid_field(
            "attachments",
            format!(
                "{} is larger than the {} MB limit",
                file.original_name,
                config.max_upload_bytes / (1024 * 1024)
            ),
        ));
    }
    Ok(normalized)
}

/// Store the bytes and record an unclaimed attachment owned by `uploader_id`.
pub async fn store_upload(
    state: &AppState,
    uploader_id: &str,
    file: IncomingFile,
) -> ApiResult<Attachment> {
    let NormalizedFile { kind, mime_type } = check_file(&state.config, &file)?;

    let id = Uuid::new_v4().to_string();
    let stored_name = match extension(&file.original_name) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.clone(),
    };
    let original_name: String = file.original_name.chars().take(MAX_FILENAME_LENGTH).collect();

    let path = state.blobs.put(&stored_name, &file.data).await?;

    let attachment = Attachment {
        id,
        message_id: None,
        uploader_id: uploader_id.to_string(),
        filename: stored_name,
        original_name,
        path,
        size: file.data.len() as i64,
        mime_type,
        kind: AttachmentType::from(kind),
        duration: normalize_duration(kind, file.duration),
        uploaded_at: db::now(),
    };

    if let Err(e) = store::attachments::insert_unclaimed(&state.db, &attachment).await {
        if let Err(cleanup) = state.blobs.remove(&attachment.path).await {
            tracing::warn!("Failed to remove orphaned blob {}: {}", attachment.path, cleanup);
        }
        return Err(e);
    }

    tracing::debug!(
        "Stored {} attachment {} ({} bytes)",
        attachment.kind.as_str(),
        attachment.id,
        attachment.size
    );
    Ok(attachment)
}

/// Validate then store every file. Nothing is written unless all files pass.
pub async fn store_all(
    state: &AppState,
    uploader_id: &str,
    files: Vec<IncomingFile>,
) -> ApiResult<Vec<Attachment>> {
    for file in &files {
        check_file(&state.config, file)?;
    }
    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        stored.push(store_upload(state, uploader_id, file).await?);
    }
    Ok(stored)
}

/// Load an attachment for download. Claimed attachments are visible to both
/// participants of the thread; unclaimed ones only to their uploader.
pub async fn find_for_download(
    state: &AppState,
    user_id: &str,
    attachment_id: &str,
) -> ApiResult<Attachment> {
    let attachment = store::attachments::find(&state.db, attachment_id)
        .await?
        .ok_or(ApiError::NotFound("Attachment"))?;

    let visible = match &attachment.message_id {
        None => attachment.uploader_id == user_id,
        Some(message_id) => store::attachments::viewers(&state.db, message_id)
            .await?
            .is_some_and(|viewers| viewers.iter().any(|v| v == user_id)),
    };

    if !visible {
        return Err(ApiError::NotFound("Attachment"));
    }
    Ok(attachment)
}
