use sqlx::SqlitePool;

use crate::db;
use crate::error::ApiResult;
use crate::models::{AuthUser, Role, UserSummary};

pub async fn find(pool: &SqlitePool, user_id: &str) -> ApiResult<Option<UserSummary>> {
    let user = sqlx::query_as::<_, UserSummary>(r#"SELECT id, username, role FROM "user" WHERE id = ?"#)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Resolve a session token to its user. Unknown and expired sessions both yield `None`.
pub async fn find_by_session(pool: &SqlitePool, token: &str) -> ApiResult<Option<AuthUser>> {
    let row = sqlx::query_as::<_, (String, String, Role, String)>(
        r#"SELECT u.id, u.username, u.role, s.expires_at
           FROM "session" s
           JOIN "user" u ON u.id = s.user_id
           WHERE s.token = ?"#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some((id, username, role, expires_at)) = row else {
        return Ok(None);
    };

    if expires_at < db::now() {
        return Ok(None);
    }

    Ok(Some(AuthUser { id, username, role }))
}
