use crate::models::AuthUser;
use crate::store;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::ClientId;
use crate::AppState;

pub async fn send_initial_state(state: &AppState, client_id: ClientId, user: &AuthUser) {
    state
        .gateway
        .send_to(
            client_id,
            &ServerEvent::Ready {
                user_id: user.id.clone(),
                role: user.role,
            },
        )
        .await;

    match store::lifecycle::unread_total(&state.db, &user.id, user.role).await {
        Ok(count) => {
            state
                .gateway
                .send_to(client_id, &ServerEvent::UnreadCountUpdate { count })
                .await;
        }
        Err(e) => tracing::warn!("Failed to load unread total for {}: {}", user.id, e),
    }

    tracing::debug!("Client {} connected as {} ({})", client_id, user.username, user.role);
}

pub async fn handle_disconnect(state: &AppState, client_id: ClientId, user: &AuthUser) {
    if let Some(client) = state.gateway.unregister(client_id).await {
        tracing::debug!(
            "Client {} for {} disconnected from {} rooms",
            client_id,
            user.id,
            client.rooms.len()
        );
    }
}
