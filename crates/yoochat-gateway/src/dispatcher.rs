use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use yoochat_social::Delivery;
use yoochat_types::events::GatewayEvent;

/// Routes events to connected clients. Every connection joins the room of
/// its user; a user with several tabs open has several connections in one
/// room.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (conn_id -> sender)
    rooms: RwLock<HashMap<i64, HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the user's room. Returns (conn_id, receiver).
    pub async fn join(&self, user_id: i64) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .rooms
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Remove one connection. The room goes away with its last connection.
    pub async fn leave(&self, user_id: i64, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(room) = rooms.get_mut(&user_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                rooms.remove(&user_id);
            }
        }
    }

    /// Send to every connection of a user. Returns how many accepted it.
    pub async fn emit_to_user(&self, user_id: i64, event: GatewayEvent) -> usize {
        let rooms = self.inner.rooms.read().await;
        let Some(room) = rooms.get(&user_id) else {
            return 0;
        };
        room.values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Send to a single connection, used for replies such as errors.
    pub async fn emit_to_connection(&self, user_id: i64, conn_id: Uuid, event: GatewayEvent) -> bool {
        let rooms = self.inner.rooms.read().await;
        rooms
            .get(&user_id)
            .and_then(|room| room.get(&conn_id))
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    pub async fn deliver(&self, delivery: Delivery) {
        self.emit_to_user(delivery.to, delivery.event).await;
    }

    pub async fn deliver_all(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.deliver(delivery).await;
        }
    }

    pub async fn connection_count(&self, user_id: i64) -> usize {
        self.inner
            .rooms
            .read()
            .await
            .get(&user_id)
            .map_or(0, HashMap::len)
    }
}
