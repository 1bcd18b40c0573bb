use std::collections::HashSet;

use super::{user_room, ClientId, GatewayState};
use crate::ws::events::ServerEvent;

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::warn!("Failed to serialize gateway event: {:?}", e);
            None
        }
    }
}

impl GatewayState {
    /// Send to every socket in any of `rooms`. A socket sitting in several of them
    /// still gets a single copy.
    pub async fn broadcast_rooms(&self, rooms: &[String], event: &ServerEvent, exclude: Option<ClientId>) {
        let Some(msg) = encode(event) else {
            return;
        };

        let room_map = self.rooms.read().await;
        let clients = self.clients.read().await;

        let mut sent: HashSet<ClientId> = HashSet::new();
        for room in rooms {
            let Some(members) = room_map.get(room) else {
                continue;
            };
            for &cid in members {
                if Some(cid) == exclude || !sent.insert(cid) {
                    continue;
                }
                if let Some(client) = clients.get(&cid) {
                    let _ = client.tx.send(msg.clone());
                }
            }
        }
    }

    pub async fn broadcast_room(&self, room: &str, event: &ServerEvent, exclude: Option<ClientId>) {
        self.broadcast_rooms(&[room.to_string()], event, exclude).await;
    }

    pub async fn send_to(&self, client_id: ClientId, event: &ServerEvent) {
        let Some(msg) = encode(event) else {
            return;
        };

        let clients = self.clients.read().await;
        if let Some(client) = clients.get(&client_id) {
            let _ = client.tx.send(msg);
        }
    }

    pub async fn send_to_user(&self, user_id: &str, event: &ServerEvent) {
        self.broadcast_room(&user_room(user_id), event, None).await;
    }
}
