mod lifecycle;
mod presence;

use axum::{
    extract::{ws::{Message, WebSocket}, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::middleware::auth::session_token;
use crate::models::AuthUser;
use crate::store;
use crate::ws::events::{ClientEvent, ServerEvent};
use crate::ws::gateway::{thread_room, ClientId};
use crate::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = extract_session(&state, &headers, &query)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn extract_session(
    state: &AppState,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Result<Option<AuthUser>, ApiError> {
    let token = query
        .get("token")
        .filter(|t| !t.is_empty())
        .cloned()
        .or_else(|| session_token(headers));

    match token {
        Some(token) => store::users::find_by_session(&state.db, &token).await,
        None => Ok(None),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    let client_id = state.gateway.next_client_id().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state
        .gateway
        .register(client_id, user.id.clone(), user.username.clone(), user.role, tx)
        .await;

    lifecycle::send_initial_state(&state, client_id, &user).await;

    // Task to forward messages from mpsc to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop
    let state_clone = state.clone();
    let user_clone = user.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text_str: &str = &text;
                    match serde_json::from_str::<ClientEvent>(text_str) {
                        Ok(event) => {
                            handle_client_event(&state_clone, client_id, &user_clone, event).await;
                        }
                        Err(e) => {
                            tracing::debug!("Ignoring malformed frame from {}: {}", user_clone.id, e);
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    lifecycle::handle_disconnect(&state, client_id, &user).await;
}

async fn handle_client_event(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    event: ClientEvent,
) {
    match event {
        ClientEvent::JoinThread { thread_id } => {
            presence::handle_join_thread(state, client_id, user, &thread_id).await;
        }
        ClientEvent::LeaveThread { thread_id } => {
            state.gateway.leave_room(client_id, &thread_room(&thread_id)).await;
        }
        ClientEvent::Typing { thread_id, is_typing } => {
            let event = ServerEvent::UserTyping {
                thread_id: thread_id.clone(),
                user_id: user.id.clone(),
                is_typing,
            };
            presence::relay(state, client_id, user, &thread_id, event).await;
        }
        ClientEvent::Recording { thread_id, is_recording, duration } => {
            let event = ServerEvent::UserRecording {
                thread_id: thread_id.clone(),
                user_id: user.id.clone(),
                is_recording,
                duration: duration.filter(|d| d.is_finite() && *d >= 0.0),
            };
            presence::relay(state, client_id, user, &thread_id, event).await;
        }
        ClientEvent::SelectingFile { thread_id, is_selecting, file_name } => {
            let event = ServerEvent::UserSelectingFile {
                thread_id: thread_id.clone(),
                user_id: user.id.clone(),
                is_selecting,
                file_name,
            };
            presence::relay(state, client_id, user, &thread_id, event).await;
        }
        ClientEvent::Ping => {}
    }
}
