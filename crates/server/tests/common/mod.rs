#![allow(dead_code)]

pub mod ws_helpers;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use inbox_server::config::{Config, DeletedMessagePolicy, DuplicateThreadPolicy};
use inbox_server::models::Role;
use inbox_server::{db, routes, AppState};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    db::apply_schema(&pool).await.unwrap();

    pool
}

pub fn test_config() -> Config {
    let upload_dir = std::env::temp_dir().join("inbox-test-uploads");
    std::fs::create_dir_all(&upload_dir).ok();

    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_upload_bytes: 10_485_760,
        max_files_per_request: 5,
        delivery_delay_ms: 0,
        delivery_poll_ms: 50,
        deleted_messages: DeletedMessagePolicy::Tombstone,
        duplicate_threads: DuplicateThreadPolicy::ReturnExisting,
    }
}

pub fn create_test_state_with(pool: SqlitePool, config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(pool, config))
}

pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    create_test_state_with(pool, test_config())
}

/// Build a test Axum app with the given pool.
pub fn create_test_app(pool: SqlitePool) -> Router {
    routes::build_router(create_test_state(pool))
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

/// Create a test user with a live session. Returns (user_id, session_token).
pub async fn create_test_user(pool: &SqlitePool, username: &str, role: Role) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = db::now();

    sqlx::query(r#"INSERT INTO "user" (id, username, role, created_at) VALUES (?, ?, ?, ?)"#)
        .bind(&user_id)
        .bind(username)
        .bind(role)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

    let session_token = uuid::Uuid::new_v4().to_string();
    let expires_at = db::timestamp(chrono::Utc::now() + chrono::Duration::days(30));

    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&session_token)
    .bind(&expires_at)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, session_token)
}

/// Create a seller and a buyer. Returns ((seller_id, seller_token), (buyer_id, buyer_token)).
pub async fn create_pair(pool: &SqlitePool) -> ((String, String), (String, String)) {
    let seller = create_test_user(pool, "acme_supply", Role::Seller).await;
    let buyer = create_test_user(pool, "bob_buyer", Role::Buyer).await;
    (seller, buyer)
}

/// Insert a thread directly. Both counters start at zero.
pub async fn create_test_thread(
    pool: &SqlitePool,
    seller_id: &str,
    buyer_id: &str,
    subject: &str,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = db::now();
    sqlx::query(
        r#"INSERT INTO threads (id, seller_id, buyer_id, subject, subject_search, type, status,
               last_message_at, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, 'message', 'active', ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(seller_id)
    .bind(buyer_id)
    .bind(subject)
    .bind(subject.to_lowercase())
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Read both unread counters of a thread as (seller, buyer).
pub async fn unread_counts(pool: &SqlitePool, thread_id: &str) -> (i64, i64) {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT seller_unread_count, buyer_unread_count FROM threads WHERE id = ?",
    )
    .bind(thread_id)
    .fetch_one(pool)
    .await
    .unwrap()
}
