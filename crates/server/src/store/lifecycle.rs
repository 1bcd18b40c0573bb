//! Message lifecycle: unread counters, read receipts, status promotion and the delivery outbox.
//!
//! Status only ever moves forward (`sent -> delivered -> read`). Every promotion is a single
//! conditional UPDATE so concurrent promoters cannot move a message backwards.

use sqlx::{SqliteConnection, SqlitePool};

use super::{fold_case, placeholders};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{MessageStatus, Role};

/// Fold a newly appended message into its thread: author's counter resets, the
/// counterpart's increments, preview and timestamps move forward. One statement.
pub async fn record_append(
    conn: &mut SqliteConnection,
    thread_id: &str,
    author: Role,
    preview: &str,
    at: &str,
) -> ApiResult<()> {
    let sql = format!(
        r#"UPDATE threads
           SET last_message_at = ?, last_message_preview = ?, preview_search = ?, updated_at = ?,
               {author} = 0, {other} = {other} + 1
           WHERE id = ?"#,
        author = author.unread_column(),
        other = author.counterpart().unread_column(),
    );
    let result = sqlx::query(&sql)
        .bind(at)
        .bind(preview)
        .bind(fold_case(preview))
        .bind(at)
        .bind(thread_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Thread"));
    }
    Ok(())
}

/// Promote one message to `to` if it has not reached it yet. Returns whether it moved.
pub async fn advance_status(
    conn: &mut SqliteConnection,
    message_id: &str,
    to: MessageStatus,
) -> ApiResult<bool> {
    let from = to.predecessors();
    if from.is_empty() {
        return Ok(false);
    }
    let sql = format!(
        "UPDATE messages SET status = ? WHERE id = ? AND status IN ({})",
        placeholders(from.len())
    );
    let mut query = sqlx::query(&sql).bind(to).bind(message_id);
    for status in from {
        query = query.bind(status);
    }
    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Mark everything the counterpart sent in `thread_id` as read by `reader_id` and reset
/// the reader's counter. Returns the ids of messages whose status moved to `read`.
pub async fn mark_thread_read(
    pool: &SqlitePool,
    thread_id: &str,
    reader_id: &str,
    reader_role: Role,
) -> ApiResult<Vec<String>> {
    let now = db::now();
    let mut tx = pool.begin().await?;

    let reset = format!(
        "UPDATE threads SET {} = 0 WHERE id = ?",
        reader_role.unread_column()
    );
    sqlx::query(&reset).bind(thread_id).execute(&mut *tx).await?;

    sqlx::query(
        r#"INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at)
           SELECT id, ?, ? FROM messages WHERE thread_id = ? AND sender_id != ?"#,
    )
    .bind(reader_id)
    .bind(&now)
    .bind(thread_id)
    .bind(reader_id)
    .execute(&mut *tx)
    .await?;

    let promoted = sqlx::query_scalar::<_, String>(
        r#"UPDATE messages SET status = ?
           WHERE thread_id = ? AND sender_id != ? AND status != ?
           RETURNING id"#,
    )
    .bind(MessageStatus::Read)
    .bind(thread_id)
    .bind(reader_id)
    .bind(MessageStatus::Read)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(promoted)
}

/// Record a read receipt for a single message. Counters are left alone.
pub async fn mark_message_read(
    pool: &SqlitePool,
    message_id: &str,
    reader_id: &str,
) -> ApiResult<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)")
        .bind(message_id)
        .bind(reader_id)
        .bind(db::now())
        .execute(&mut *tx)
        .await?;
    let promoted = advance_status(&mut *tx, message_id, MessageStatus::Read).await?;
    tx.commit().await?;
    Ok(promoted)
}

/// Sum of the user's counters across every thread they take part in as `role`.
pub async fn unread_total(pool: &SqlitePool, user_id: &str, role: Role) -> ApiResult<i64> {
    let sql = format!(
        "SELECT COALESCE(SUM({}), 0) FROM threads WHERE {} = ?",
        role.unread_column(),
        role.participant_column()
    );
    let total = sqlx::query_scalar::<_, i64>(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn enqueue_delivery(
    conn: &mut SqliteConnection,
    message_id: &str,
    thread_id: &str,
    due_at: &str,
) -> ApiResult<()> {
    sqlx::query("INSERT OR IGNORE INTO delivery_outbox (message_id, thread_id, due_at) VALUES (?, ?, ?)")
        .bind(message_id)
        .bind(thread_id)
        .bind(due_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingDelivery {
    pub message_id: String,
    pub thread_id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub attempts: i64,
}

pub async fn due_deliveries(
    pool: &SqlitePool,
    now: &str,
    limit: i64,
) -> ApiResult<Vec<PendingDelivery>> {
    let pending = sqlx::query_as::<_, PendingDelivery>(
        r#"SELECT o.message_id, o.thread_id, t.seller_id, t.buyer_id, o.attempts
           FROM delivery_outbox o
           JOIN threads t ON t.id = o.thread_id
           WHERE o.due_at <= ?
           ORDER BY o.due_at
           LIMIT ?"#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(pending)
}

/// Promote a due message to `delivered` and drop its outbox entry in one transaction.
pub async fn complete_delivery(pool: &SqlitePool, message_id: &str) -> ApiResult<bool> {
    let mut tx = pool.begin().await?;
    let promoted = advance_status(&mut *tx, message_id, MessageStatus::Delivered).await?;
    sqlx::query("DELETE FROM delivery_outbox WHERE message_id = ?")
        .bind(message_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(promoted)
}

pub async fn defer_delivery(pool: &SqlitePool, message_id: &str, next_due: &str) -> ApiResult<()> {
    sqlx::query("UPDATE delivery_outbox SET attempts = attempts + 1, due_at = ? WHERE message_id = ?")
        .bind(next_due)
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(())
}
