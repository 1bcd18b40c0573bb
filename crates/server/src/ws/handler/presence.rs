use crate::models::AuthUser;
use crate::store;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::{thread_room, user_room, ClientId};
use crate::AppState;

/// Subscribe the socket to a thread room after checking participation in the store.
pub async fn handle_join_thread(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    thread_id: &str,
) {
    match store::threads::find(&state.db, thread_id).await {
        Ok(Some(thread)) if thread.is_participant(&user.id) => {
            state.gateway.join_room(client_id, &thread_room(thread_id)).await;
            state
                .gateway
                .send_to(
                    client_id,
                    &ServerEvent::ThreadJoined {
                        thread_id: thread_id.to_string(),
                    },
                )
                .await;
        }
        Ok(_) => {
            state
                .gateway
                .send_to(
                    client_id,
                    &ServerEvent::Error {
                        message: "Thread not found".into(),
                    },
                )
                .await;
        }
        Err(e) => {
            tracing::error!("Failed to load thread {} for join: {}", thread_id, e);
            state
                .gateway
                .send_to(
                    client_id,
                    &ServerEvent::Error {
                        message: "Could not join thread".into(),
                    },
                )
                .await;
        }
    }
}

/// Relay an ephemeral presence event to the other side of the thread. Events from
/// anyone who is not a participant are dropped without a reply.
pub async fn relay(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    thread_id: &str,
    event: ServerEvent,
) {
    let thread = match store::threads::find(&state.db, thread_id).await {
        Ok(Some(thread)) => thread,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!("Dropping presence for {}: {}", thread_id, e);
            return;
        }
    };
    let Some(role) = thread.role_of(&user.id) else {
        tracing::debug!("Dropping presence from non-participant {} in {}", user.id, thread_id);
        return;
    };

    let rooms = [
        thread_room(thread_id),
        user_room(thread.participant(role.counterpart())),
    ];
    state
        .gateway
        .broadcast_rooms(&rooms, &event, Some(client_id))
        .await;
}
