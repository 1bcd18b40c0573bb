mod broadcast;

use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};

use crate::models::Role;

pub type ClientId = u64;

pub fn thread_room(thread_id: &str) -> String {
    format!("thread:{}", thread_id)
}

pub fn user_room(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub struct ConnectedClient {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub tx: mpsc::UnboundedSender<String>,
    pub rooms: HashSet<String>,
}

/// In-process registry of sockets and the rooms they sit in.
pub struct GatewayState {
    next_id: RwLock<u64>,
    pub clients: RwLock<HashMap<ClientId, ConnectedClient>>,
    pub rooms: RwLock<HashMap<String, HashSet<ClientId>>>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            next_id: RwLock::new(1),
            clients: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn next_client_id(&self) -> ClientId {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }

    /// Register a socket. It starts out in its user's personal room.
    pub async fn register(
        &self,
        client_id: ClientId,
        user_id: String,
        username: String,
        role: Role,
        tx: mpsc::UnboundedSender<String>,
    ) {
        let personal = user_room(&user_id);
        let client = ConnectedClient {
            user_id,
            username,
            role,
            tx,
            rooms: HashSet::from([personal.clone()]),
        };
        self.clients.write().await.insert(client_id, client);
        self.rooms
            .write()
            .await
            .entry(personal)
            .or_default()
            .insert(client_id);
    }

    pub async fn unregister(&self, client_id: ClientId) -> Option<ConnectedClient> {
        let client = self.clients.write().await.remove(&client_id)?;

        let mut rooms = self.rooms.write().await;
        for room in &client.rooms {
            if let Some(set) = rooms.get_mut(room) {
                set.remove(&client_id);
                if set.is_empty() {
                    rooms.remove(room);
                }
            }
        }

        Some(client)
    }

    pub async fn join_room(&self, client_id: ClientId, room: &str) {
        self.rooms
            .write()
            .await
            .entry(room.to_string())
            .or_default()
            .insert(client_id);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.rooms.insert(room.to_string());
        }
    }

    pub async fn leave_room(&self, client_id: ClientId, room: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(set) = rooms.get_mut(room) {
            set.remove(&client_id);
            if set.is_empty() {
                rooms.remove(room);
            }
        }
        drop(rooms);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.rooms.remove(room);
        }
    }

    pub async fn is_in_room(&self, client_id: ClientId, room: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(room)
            .is_some_and(|set| set.contains(&client_id))
    }
}
