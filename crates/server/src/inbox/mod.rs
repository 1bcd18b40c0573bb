//! Role-parameterised inbox service. Both routers call into here with a [`Caller`];
//! each operation validates, writes through the store, then notifies.
//!
//! [`Caller`]: crate::models::Caller

pub mod delivery;
pub mod messages;
pub mod threads;
pub mod uploads;

use crate::models::{Role, Thread};
use crate::store;
use crate::ws::events::ServerEvent;
use crate::ws::fanout::ThreadAudience;
use crate::AppState;

pub(crate) async fn publish_thread_updated(state: &AppState, thread: &Thread) {
    state
        .fanout
        .publish_thread(
            ThreadAudience::of(thread),
            &ServerEvent::ThreadUpdated {
                thread_id: thread.id.clone(),
                thread: thread.clone(),
            },
        )
        .await;
}

/// Push the user's current unread total to all of their sockets.
pub(crate) async fn push_unread_total(state: &AppState, user_id: &str, role: Role) {
    match store::lifecycle::unread_total(&state.db, user_id, role).await {
        Ok(count) => {
            state
                .fanout
                .publish_user(user_id, &ServerEvent::UnreadCountUpdate { count })
                .await;
        }
        Err(e) => tracing::warn!("Failed to compute unread total for {}: {}", user_id, e),
    }
}
