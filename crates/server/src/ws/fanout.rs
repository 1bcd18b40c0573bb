//! Publishing side of the realtime layer. Services only talk to [`Fanout`], so the
//! in-process registry can be swapped for a shared backplane.

use async_trait::async_trait;

use crate::models::Thread;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::{thread_room, user_room, GatewayState};

/// Everyone entitled to a thread's events: the room plus both participants.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAudience<'a> {
    pub thread_id: &'a str,
    pub participants: [&'a str; 2],
}

impl<'a> ThreadAudience<'a> {
    pub fn of(thread: &'a Thread) -> Self {
        Self {
            thread_id: &thread.id,
            participants: thread.participants(),
        }
    }

    fn rooms(&self) -> Vec<String> {
        let mut rooms = vec![thread_room(self.thread_id)];
        rooms.extend(self.participants.iter().map(|p| user_room(p)));
        rooms
    }
}

#[async_trait]
pub trait Fanout: Send + Sync {
    /// Deliver to the thread room and both participants' personal rooms, once per socket.
    async fn publish_thread(&self, audience: ThreadAudience<'_>, event: &ServerEvent);

    /// Deliver to every socket of one user.
    async fn publish_user(&self, user_id: &str, event: &ServerEvent);
}

#[async_trait]
impl Fanout for GatewayState {
    async fn publish_thread(&self, audience: ThreadAudience<'_>, event: &ServerEvent) {
        self.broadcast_rooms(&audience.rooms(), event, None).await;
    }

    async fn publish_user(&self, user_id: &str, event: &ServerEvent) {
        self.send_to_user(user_id, event).await;
    }
}
