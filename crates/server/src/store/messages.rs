use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use inbox_shared::constants::{DELETED_MESSAGE_TOMBSTONE, MAX_PAGE_SIZE, MESSAGE_PAGE_SIZE};
use inbox_shared::validation::validate_message_content;

use super::{lifecycle, placeholders, reactions};
use crate::config::DeletedMessagePolicy;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    message_preview, page_window, Attachment, AttachmentType, ForwardedFrom, Message,
    MessageQuery, MessageRow, MessageStatus, Pagination, Role,
};

/// Where a new message's attachments come from.
pub enum AttachmentSource {
    /// Pending uploads by the sender, claimed by id.
    Uploaded(Vec<String>),
    /// Attachments of another message, copied onto the new one.
    Copied(Vec<Attachment>),
}

impl AttachmentSource {
    pub fn len(&self) -> usize {
        match self {
            AttachmentSource::Uploaded(ids) => ids.len(),
            AttachmentSource::Copied(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct NewMessage<'a> {
    pub thread_id: &'a str,
    pub sender_id: &'a str,
    pub sender_type: Role,
    pub content: &'a str,
    pub attachments: AttachmentSource,
    pub reply_to: Option<&'a str>,
    pub forwarded_from: Option<ForwardedFrom>,
}

/// Append a message and fold it into its thread's counters, preview and delivery
/// schedule. All of it commits or none of it does.
pub async fn append(
    pool: &SqlitePool,
    new: NewMessage<'_>,
    deliver_at: &str,
) -> ApiResult<Message> {
    let content = new.content.trim();
    validate_message_content(content, new.attachments.len())
        .map_err(|e| ApiError::invalid_field("content", e))?;

    let id = Uuid::new_v4().to_string();
    let now = db::now();
    let (fwd_thread, fwd_message, fwd_sender) = match new.forwarded_from {
        Some(f) => (Some(f.thread_id), Some(f.message_id), Some(f.original_sender_id)),
        None => (None, None, None),
    };

    let mut tx = pool.begin().await?;

    // Must be the first statement: a deferred transaction that reads first cannot take
    // the write lock once another writer has committed.
    let inserted = sqlx::query(
        r#"INSERT INTO messages (id, thread_id, sender_id, sender_type, content, status, reply_to,
               forwarded_thread_id, forwarded_message_id, forwarded_sender_id, created_at)
           SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
           WHERE ? IS NULL
              OR EXISTS (SELECT 1 FROM messages WHERE id = ? AND thread_id = ?)"#,
    )
    .bind(&id)
    .bind(new.thread_id)
    .bind(new.sender_id)
    .bind(new.sender_type)
    .bind(content)
    .bind(MessageStatus::Sent)
    .bind(new.reply_to)
    .bind(fwd_thread)
    .bind(fwd_message)
    .bind(fwd_sender)
    .bind(&now)
    .bind(new.reply_to)
    .bind(new.reply_to)
    .bind(new.thread_id)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Reply target"));
    }

    let mut kinds: Vec<AttachmentType> = Vec::with_capacity(new.attachments.len());
    match new.attachments {
        AttachmentSource::Uploaded(ids) => {
            for attachment_id in &ids {
                let kind = sqlx::query_scalar::<_, AttachmentType>(
                    r#"UPDATE attachments SET message_id = ?
                       WHERE id = ? AND uploader_id = ? AND message_id IS NULL
                       RETURNING type"#,
                )
                .bind(&id)
                .bind(attachment_id)
                .bind(new.sender_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    ApiError::invalid_field(
                        "attachmentIds",
                        format!("Attachment {} is not available", attachment_id),
                    )
                })?;
                kinds.push(kind);
            }
        }
        AttachmentSource::Copied(list) => {
            for attachment in list {
                sqlx::query(
                    r#"INSERT INTO attachments (id, message_id, uploader_id, filename, original_name,
                           path, size, mime_type, type, duration, uploaded_at)
                       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&id)
                .bind(new.sender_id)
                .bind(&attachment.filename)
                .bind(&attachment.original_name)
                .bind(&attachment.path)
                .bind(attachment.size)
                .bind(&attachment.mime_type)
                .bind(attachment.kind)
                .bind(attachment.duration)
                .bind(&attachment.uploaded_at)
                .execute(&mut *tx)
                .await?;
                kinds.push(attachment.kind);
            }
        }
    }

    sqlx::query("INSERT INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(new.sender_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    let preview = message_preview(content, &kinds);
    lifecycle::record_append(&mut *tx, new.thread_id, new.sender_type, &preview, &now).await?;
    lifecycle::enqueue_delivery(&mut *tx, &id, new.thread_id, deliver_at).await?;

    tx.commit().await?;

    get(pool, &id).await?.ok_or(ApiError::NotFound("Message"))
}

pub async fn find_row(pool: &SqlitePool, message_id: &str) -> ApiResult<Option<MessageRow>> {
    let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = ?")
        .bind(message_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Load a message that belongs to `thread_id`; a message in another thread is not found.
pub async fn find_in_thread(
    pool: &SqlitePool,
    thread_id: &str,
    message_id: &str,
) -> ApiResult<MessageRow> {
    match find_row(pool, message_id).await? {
        Some(row) if row.thread_id == thread_id => Ok(row),
        _ => Err(ApiError::NotFound("Message")),
    }
}

pub async fn get(pool: &SqlitePool, message_id: &str) -> ApiResult<Option<Message>> {
    let Some(row) = find_row(pool, message_id).await? else {
        return Ok(None);
    };
    Ok(hydrate(pool, vec![row]).await?.pop())
}

/// Join attachments, reactions and readers onto rows with one query per child table.
pub async fn hydrate(pool: &SqlitePool, rows: Vec<MessageRow>) -> ApiResult<Vec<Message>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let in_clause = placeholders(ids.len());

    let sql = format!(
        "SELECT * FROM attachments WHERE message_id IN ({}) ORDER BY uploaded_at, rowid",
        in_clause
    );
    let mut query = sqlx::query_as::<_, Attachment>(&sql);
    for id in &ids {
        query = query.bind(id);
    }
    let mut attachments: HashMap<String, Vec<Attachment>> = HashMap::new();
    for attachment in query.fetch_all(pool).await? {
        if let Some(message_id) = attachment.message_id.clone() {
            attachments.entry(message_id).or_default().push(attachment);
        }
    }

    let mut reacted: HashMap<String, Vec<_>> = HashMap::new();
    for reaction in reactions::for_messages(pool, &ids).await? {
        reacted
            .entry(reaction.message_id.clone())
            .or_default()
            .push(reaction);
    }

    let sql = format!(
        "SELECT message_id, user_id FROM message_reads WHERE message_id IN ({}) ORDER BY read_at",
        in_clause
    );
    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    for id in &ids {
        query = query.bind(id);
    }
    let mut readers: HashMap<String, Vec<String>> = HashMap::new();
    for (message_id, user_id) in query.fetch_all(pool).await? {
        readers.entry(message_id).or_default().push(user_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id.clone();
            Message::assemble(
                row,
                attachments.remove(&id).unwrap_or_default(),
                reacted.remove(&id).unwrap_or_default(),
                readers.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

/// A page of a thread's messages in chronological order. Page 1 holds the newest.
pub async fn list_by_thread(
    pool: &SqlitePool,
    thread_id: &str,
    query: &MessageQuery,
    deleted: DeletedMessagePolicy,
) -> ApiResult<(Vec<Message>, Pagination)> {
    let (page, limit, offset) =
        page_window(query.page, query.limit, MESSAGE_PAGE_SIZE, MAX_PAGE_SIZE);
    let visibility = match deleted {
        DeletedMessagePolicy::Tombstone => "",
        DeletedMessagePolicy::Hide => " AND is_deleted = 0",
    };

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM messages WHERE thread_id = ?{}",
        visibility
    ))
    .bind(thread_id)
    .fetch_one(pool)
    .await?;

    let mut rows = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT * FROM messages WHERE thread_id = ?{} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        visibility
    ))
    .bind(thread_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.reverse();

    let messages = hydrate(pool, rows).await?;
    Ok((messages, Pagination::new(page, limit, total)))
}

/// Replace a message's text. Only the sender may edit, and never after deletion.
pub async fn edit(
    pool: &SqlitePool,
    row: &MessageRow,
    editor_id: &str,
    content: &str,
) -> ApiResult<Message> {
    if row.sender_id != editor_id {
        return Err(ApiError::Forbidden("Only the sender can edit this message".into()));
    }
    if row.is_deleted {
        return Err(ApiError::invalid("Deleted messages cannot be edited"));
    }

    let content = content.trim();
    let attachment_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attachments WHERE message_id = ?")
            .bind(&row.id)
            .fetch_one(pool)
            .await?;
    validate_message_content(content, attachment_count as usize)
        .map_err(|e| ApiError::invalid_field("content", e))?;

    let result = sqlx::query(
        "UPDATE messages SET content = ?, is_edited = 1, edited_at = ? WHERE id = ? AND is_deleted = 0",
    )
    .bind(content)
    .bind(db::now())
    .bind(&row.id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::invalid("Deleted messages cannot be edited"));
    }

    get(pool, &row.id)
        .await?
        .ok_or(ApiError::NotFound("Message"))
}

/// Soft-delete: the row stays as a tombstone so replies and forwards keep resolving.
pub async fn soft_delete(pool: &SqlitePool, row: &MessageRow, requester_id: &str) -> ApiResult<Message> {
    if row.sender_id != requester_id {
        return Err(ApiError::Forbidden("Only the sender can delete this message".into()));
    }

    sqlx::query(
        "UPDATE messages SET content = ?, is_deleted = 1, deleted_at = ? WHERE id = ? AND is_deleted = 0",
    )
    .bind(DELETED_MESSAGE_TOMBSTONE)
    .bind(db::now())
    .bind(&row.id)
    .execute(pool)
    .await?;

    get(pool, &row.id)
        .await?
        .ok_or(ApiError::NotFound("Message"))
}
