use chrono::Utc;
use serde::Serialize;

use inbox_shared::validation::{validate_attachment_count, validate_emoji, validate_message_content};

use super::uploads::{self, IncomingFile};
use super::{publish_thread_updated, push_unread_total};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Attachment, Caller, ForwardedFrom, Message, MessageQuery, MessageRow, MessageStatus,
    Pagination, SendMessageRequest, Thread,
};
use crate::store::{
    self, lifecycle,
    messages::{AttachmentSource, NewMessage},
    reactions,
};
use crate::ws::events::ServerEvent;
use crate::ws::fanout::ThreadAudience;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

fn deliver_at(state: &AppState) -> String {
    let delay = chrono::Duration::milliseconds(state.config.delivery_delay_ms as i64);
    db::timestamp(Utc::now() + delay)
}

/// Keep the first occurrence of each id.
fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Thread and message the caller may act on. Wrong thread or wrong message is NotFound.
async fn load_target(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    message_id: &str,
) -> ApiResult<(Thread, MessageRow)> {
    let thread = store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;
    let row = store::messages::find_in_thread(&state.db, thread_id, message_id).await?;
    Ok((thread, row))
}

/// Resolve a message the caller is allowed to forward.
async fn forward_source(state: &AppState, caller: &Caller, message_id: &str) -> ApiResult<MessageRow> {
    let row = store::messages::find_row(&state.db, message_id)
        .await?
        .ok_or(ApiError::NotFound("Message"))?;
    store::threads::find_for(&state.db, &row.thread_id, caller.id(), caller.role)
        .await
        .map_err(|_| ApiError::NotFound("Message"))?;
    if row.is_deleted {
        return Err(ApiError::NotFound("Message"));
    }
    Ok(row)
}

fn provenance(row: &MessageRow) -> ForwardedFrom {
    ForwardedFrom {
        thread_id: row.thread_id.clone(),
        message_id: row.id.clone(),
        original_sender_id: row.sender_id.clone(),
    }
}

/// Runs after the message is committed, so failures here are logged and never
/// reach the sender.
async fn announce_new_message(state: &AppState, message: &Message) {
    let thread = match store::threads::find(&state.db, &message.thread_id).await {
        Ok(Some(thread)) => thread,
        Ok(None) => {
            tracing::warn!("Thread {} vanished before announcing {}", message.thread_id, message.id);
            return;
        }
        Err(e) => {
            tracing::warn!("Failed to announce message {}: {}", message.id, e);
            return;
        }
    };

    state
        .fanout
        .publish_thread(
            ThreadAudience::of(&thread),
            &ServerEvent::NewMessage {
                thread_id: thread.id.clone(),
                message: message.clone(),
            },
        )
        .await;
    publish_thread_updated(state, &thread).await;

    let recipient = message.sender_type.counterpart();
    push_unread_total(state, thread.participant(recipient), recipient).await;
    push_unread_total(state, &message.sender_id, message.sender_type).await;
}

async fn discard_uploads(state: &AppState, uploaded: &[Attachment]) {
    for attachment in uploaded {
        match store::attachments::discard_unclaimed(&state.db, &attachment.id).await {
            Ok(true) => {
                if let Err(e) = state.blobs.remove(&attachment.path).await {
                    tracing::warn!("Failed to remove blob {}: {}", attachment.path, e);
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to discard upload {}: {}", attachment.id, e),
        }
    }
}

pub async fn list_messages(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    query: &MessageQuery,
) -> ApiResult<MessagePage> {
    store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;
    let (messages, pagination) = store::messages::list_by_thread(
        &state.db,
        thread_id,
        query,
        state.config.deleted_messages,
    )
    .await?;
    Ok(MessagePage {
        messages,
        pagination,
    })
}

/// Post a message with pre-uploaded attachments and/or files received inline.
pub async fn send_message(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    req: SendMessageRequest,
    files: Vec<IncomingFile>,
) -> ApiResult<Message> {
    store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;

    let mut attachment_ids = dedup_ids(req.attachment_ids);
    let attachment_count = attachment_ids.len() + files.len();
    validate_attachment_count(attachment_count, state.config.max_files_per_request)
        .map_err(|e| ApiError::invalid_field("attachments", e))?;
    validate_message_content(req.content.trim(), attachment_count)
        .map_err(|e| ApiError::invalid_field("content", e))?;

    let forwarded_from = match &req.forwarded_from {
        Some(reference) => Some(provenance(
            &forward_source(state, caller, &reference.message_id).await?,
        )),
        None => None,
    };
    let reply_to = req.reply_to.as_deref().map(str::trim).filter(|r| !r.is_empty());

    let uploaded = uploads::store_all(state, caller.id(), files).await?;
    attachment_ids.extend(uploaded.iter().map(|a| a.id.clone()));

    let appended = store::messages::append(
        &state.db,
        NewMessage {
            thread_id,
            sender_id: caller.id(),
            sender_type: caller.role,
            content: &req.content,
            attachments: AttachmentSource::Uploaded(attachment_ids),
            reply_to,
            forwarded_from,
        },
        &deliver_at(state),
    )
    .await;

    let message = match appended {
        Ok(message) => message,
        Err(e) => {
            discard_uploads(state, &uploaded).await;
            return Err(e);
        }
    };

    tracing::info!(
        "Message {} sent in {} by {} {}",
        message.id,
        thread_id,
        caller.role,
        caller.id()
    );
    announce_new_message(state, &message).await;
    Ok(message)
}

pub async fn edit_message(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    message_id: &str,
    content: &str,
) -> ApiResult<Message> {
    let (thread, row) = load_target(state, caller, thread_id, message_id).await?;
    let message = store::messages::edit(&state.db, &row, caller.id(), content).await?;

    state
        .fanout
        .publish_thread(
            ThreadAudience::of(&thread),
            &ServerEvent::MessageUpdated {
                thread_id: thread.id.clone(),
                message: message.clone(),
            },
        )
        .await;
    Ok(message)
}

pub async fn delete_message(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    message_id: &str,
) -> ApiResult<Message> {
    let (thread, row) = load_target(state, caller, thread_id, message_id).await?;
    let message = store::messages::soft_delete(&state.db, &row, caller.id()).await?;

    state
        .fanout
        .publish_thread(
            ThreadAudience::of(&thread),
            &ServerEvent::MessageDeleted {
                thread_id: thread.id.clone(),
                message_id: message.id.clone(),
                message: message.clone(),
            },
        )
        .await;
    Ok(message)
}

/// Toggle the caller's reaction. Applying the same emoji twice removes it.
pub async fn react(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    message_id: &str,
    emoji: &str,
) -> ApiResult<Message> {
    validate_emoji(emoji).map_err(|e| ApiError::invalid_field("emoji", e))?;
    let emoji = emoji.trim();

    let (thread, row) = load_target(state, caller, thread_id, message_id).await?;
    if row.is_deleted {
        return Err(ApiError::invalid("Deleted messages cannot be reacted to"));
    }

    let change = reactions::toggle(&state.db, &row.id, caller.id(), emoji).await?;
    let message = store::messages::get(&state.db, &row.id)
        .await?
        .ok_or(ApiError::NotFound("Message"))?;

    state
        .fanout
        .publish_thread(
            ThreadAudience::of(&thread),
            &ServerEvent::MessageReacted {
                thread_id: thread.id.clone(),
                message_id: message.id.clone(),
                user_id: caller.id().to_string(),
                emoji: emoji.to_string(),
                action: change,
                reactions: message.reactions.clone(),
            },
        )
        .await;
    Ok(message)
}

/// Copy a message, with its attachments, into another thread the caller takes part in.
pub async fn forward(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    message_id: &str,
    target_thread_id: &str,
) -> ApiResult<Message> {
    let (_, row) = load_target(state, caller, thread_id, message_id).await?;
    if row.is_deleted {
        return Err(ApiError::NotFound("Message"));
    }
    let target =
        store::threads::find_for(&state.db, target_thread_id, caller.id(), caller.role).await?;

    let attachments = store::attachments::of_message(&state.db, &row.id).await?;
    let message = store::messages::append(
        &state.db,
        NewMessage {
            thread_id: &target.id,
            sender_id: caller.id(),
            sender_type: caller.role,
            content: &row.content,
            attachments: AttachmentSource::Copied(attachments),
            reply_to: None,
            forwarded_from: Some(provenance(&row)),
        },
        &deliver_at(state),
    )
    .await?;

    tracing::info!(
        "Message {} forwarded from {} to {} as {}",
        row.id,
        row.thread_id,
        target.id,
        message.id
    );
    announce_new_message(state, &message).await;
    Ok(message)
}

/// Read receipt for one counterpart message. The thread's counter is left alone.
pub async fn mark_message_read(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    message_id: &str,
) -> ApiResult<Message> {
    let (thread, row) = load_target(state, caller, thread_id, message_id).await?;

    if row.sender_id != caller.id()
        && lifecycle::mark_message_read(&state.db, &row.id, caller.id()).await?
    {
        state
            .fanout
            .publish_thread(
                ThreadAudience::of(&thread),
                &ServerEvent::MessageStatusChanged {
                    thread_id: thread.id.clone(),
                    message_ids: vec![row.id.clone()],
                    status: MessageStatus::Read,
                    read_by: Some(caller.id().to_string()),
                },
            )
            .await;
    }

    store::messages::get(&state.db, &row.id)
        .await?
        .ok_or(ApiError::NotFound("Message"))
}

/// First phase of a two-phase send: store files now, claim them by id later.
pub async fn upload(
    state: &AppState,
    caller: &Caller,
    files: Vec<IncomingFile>,
) -> ApiResult<Vec<Attachment>> {
    if files.is_empty() {
        return Err(ApiError::invalid_field("attachments", "No files uploaded"));
    }
    validate_attachment_count(files.len(), state.config.max_files_per_request)
        .map_err(|e| ApiError::invalid_field("attachments", e))?;
    uploads::store_all(state, caller.id(), files).await
}
