//! Connection Hub
//!
//! Tracks which users have live-sync connections open and fans refresh
//! frames out to them. A user may hold several connections (one per portal
//! tab); a push reaches all of them. Senders that fail are dropped on the
//! spot, so crashed connections cannot accumulate.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::livesync::ServerFrame;

type ConnectionMap = HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<ServerFrame>>>;

pub struct UserHub {
    connections: RwLock<ConnectionMap>,
}

impl UserHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection for a user
    ///
    /// Returns the connection id and the frame receiver to pump into the
    /// socket.
    pub async fn register(&self, user_id: &str) -> (Uuid, mpsc::UnboundedReceiver<ServerFrame>) {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .insert(connection_id, tx);
        tracing::debug!(connection_id = %connection_id, user_id = %user_id, "Live-sync connection registered");
        (connection_id, rx)
    }

    pub async fn unregister(&self, user_id: &str, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(user_connections) = connections.get_mut(user_id) {
            user_connections.remove(&connection_id);
            if user_connections.is_empty() {
                connections.remove(user_id);
            }
        }
        tracing::debug!(connection_id = %connection_id, "Live-sync connection unregistered");
    }

    /// Send a refresh frame to every connection the user has open
    ///
    /// Returns how many connections it reached.
    pub async fn push_refresh(&self, user_id: &str) -> usize {
        let mut connections = self.connections.write().await;
        let Some(user_connections) = connections.get_mut(user_id) else {
            return 0;
        };

        let mut delivered = 0;
        user_connections.retain(|connection_id, tx| match tx.send(ServerFrame::Refresh) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::debug!(connection_id = %connection_id, "Dropping dead live-sync connection");
                false
            }
        });
        if user_connections.is_empty() {
            connections.remove(user_id);
        }
        delivered
    }

    /// Total connections across all users
    pub async fn connection_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .map(|user_connections| user_connections.len())
            .sum()
    }
}

impl Default for UserHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_reaches_every_connection_of_the_user() {
        let hub = UserHub::new();
        let (_, mut rx_a) = hub.register("asha").await;
        let (_, mut rx_b) = hub.register("asha").await;
        let (_, mut rx_other) = hub.register("ravi").await;

        assert_eq!(hub.push_refresh("asha").await, 2);
        assert!(matches!(rx_a.try_recv(), Ok(ServerFrame::Refresh)));
        assert!(matches!(rx_b.try_recv(), Ok(ServerFrame::Refresh)));
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_to_unknown_user_reaches_nobody() {
        let hub = UserHub::new();
        assert_eq!(hub.push_refresh("ghost").await, 0);
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let hub = UserHub::new();
        let (connection_id, mut rx) = hub.register("asha").await;
        hub.unregister("asha", connection_id).await;

        assert_eq!(hub.push_refresh("asha").await, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_dead_connections_are_pruned_on_push() {
        let hub = UserHub::new();
        let (_, rx) = hub.register("asha").await;
        drop(rx);

        assert_eq!(hub.push_refresh("asha").await, 0);
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_count_spans_users() {
        let hub = UserHub::new();
        hub.register("asha").await;
        hub.register("asha").await;
        hub.register("ravi").await;
        assert_eq!(hub.connection_count().await, 3);
    }
}
