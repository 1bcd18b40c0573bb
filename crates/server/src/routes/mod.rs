pub mod extract;
pub mod files;
pub mod messages;
pub mod threads;

use crate::models::Role;
use crate::ws;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

/// Routes shared by both inbox facades. The role extension decides whose inbox it is.
fn inbox_routes(role: Role) -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(threads::stats))
        .route("/threads", get(threads::list_threads).post(threads::create_thread))
        .route(
            "/threads/{threadId}",
            get(threads::get_thread)
                .put(threads::update_thread)
                .delete(threads::archive_thread),
        )
        .route("/threads/{threadId}/read", post(threads::mark_read))
        .route(
            "/threads/{threadId}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/threads/{threadId}/messages/{messageId}",
            axum::routing::put(messages::edit_message).delete(messages::delete_message),
        )
        .route("/threads/{threadId}/messages/{messageId}/react", post(messages::react))
        .route("/threads/{threadId}/messages/{messageId}/forward", post(messages::forward))
        .route(
            "/threads/{threadId}/messages/{messageId}/read",
            post(messages::mark_message_read),
        )
        .route("/upload", post(files::upload))
        .layer(Extension(role))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes();

    Router::new()
        .nest("/api/seller", inbox_routes(Role::Seller))
        .nest("/api/buyer", inbox_routes(Role::Buyer))
        .route("/api/files/{attachmentId}", get(files::serve_file))
        .route("/gateway", get(ws::handler::ws_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
