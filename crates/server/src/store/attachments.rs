use sqlx::SqlitePool;

use crate::error::ApiResult;
use crate::models::Attachment;

/// Record a stored upload that no message has claimed yet.
pub async fn insert_unclaimed(pool: &SqlitePool, attachment: &Attachment) -> ApiResult<()> {
    sqlx::query(
        r#"INSERT INTO attachments (id, message_id, uploader_id, filename, original_name, path,
               size, mime_type, type, duration, uploaded_at)
           VALUES (?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&attachment.id)
    .bind(&attachment.uploader_id)
    .bind(&attachment.filename)
    .bind(&attachment.original_name)
    .bind(&attachment.path)
    .bind(attachment.size)
    .bind(&attachment.mime_type)
    .bind(attachment.kind)
    .bind(attachment.duration)
    .bind(&attachment.uploaded_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop an upload that was never claimed. Returns whether a row went away.
pub async fn discard_unclaimed(pool: &SqlitePool, attachment_id: &str) -> ApiResult<bool> {
    let result = sqlx::query("DELETE FROM attachments WHERE id = ? AND message_id IS NULL")
        .bind(attachment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find(pool: &SqlitePool, attachment_id: &str) -> ApiResult<Option<Attachment>> {
    let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
        .bind(attachment_id)
        .fetch_optional(pool)
        .await?;
    Ok(attachment)
}

pub async fn of_message(pool: &SqlitePool, message_id: &str) -> ApiResult<Vec<Attachment>> {
    let attachments = sqlx::query_as::<_, Attachment>(
        "SELECT * FROM attachments WHERE message_id = ? ORDER BY uploaded_at, rowid",
    )
    .bind(message_id)
    .fetch_all(pool)
    .await?;
    Ok(attachments)
}

/// Who may see a claimed attachment: nobody once its message is deleted, otherwise
/// the two participants of the message's thread.
pub async fn viewers(pool: &SqlitePool, message_id: &str) -> ApiResult<Option<[String; 2]>> {
    let row = sqlx::query_as::<_, (bool, String, String)>(
        r#"SELECT m.is_deleted, t.seller_id, t.buyer_id
           FROM messages m JOIN threads t ON t.id = m.thread_id
           WHERE m.id = ?"#,
    )
    .bind(message_id)
    .fetch_optional(pool)
    .await?;
    Ok(match row {
        Some((false, seller_id, buyer_id)) => Some([seller_id, buyer_id]),
        _ => None,
    })
}
