use serde::Serialize;
use sqlx::SqlitePool;

use super::placeholders;
use crate::db;
use crate::error::ApiResult;
use crate::models::Reaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionChange {
    Added,
    Removed,
}

/// Flip `(message, user, emoji)` in the reaction set.
pub async fn toggle(
    pool: &SqlitePool,
    message_id: &str,
    user_id: &str,
    emoji: &str,
) -> ApiResult<ReactionChange> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?")
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&mut *tx)
        .await?;

    let change = if removed.rows_affected() > 0 {
        ReactionChange::Removed
    } else {
        sqlx::query(
            "INSERT OR IGNORE INTO reactions (message_id, user_id, emoji, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .bind(db::now())
        .execute(&mut *tx)
        .await?;
        ReactionChange::Added
    };

    tx.commit().await?;
    Ok(change)
}

pub async fn for_messages(pool: &SqlitePool, message_ids: &[String]) -> ApiResult<Vec<Reaction>> {
    if message_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT message_id, emoji, user_id, created_at FROM reactions WHERE message_id IN ({}) ORDER BY created_at, emoji",
        placeholders(message_ids.len())
    );
    let mut query = sqlx::query_as::<_, Reaction>(&sql);
    for id in message_ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(pool).await?)
}
