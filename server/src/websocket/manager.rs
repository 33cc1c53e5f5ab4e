//! WebSocket connection manager.
//!
//! Tracks active WebSocket connections and which collections each one
//! watches, and fans collection snapshots out to the right subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use tether_store::Document;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: String,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Index of subscriber connection IDs by collection name.
    by_collection: DashMap<String, Vec<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            by_collection: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.connections.insert(
            conn_id.clone(),
            Connection {
                id: conn_id.clone(),
                sender,
            },
        );

        tracing::info!(conn_id = %conn_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection and drop all of its subscriptions.
    pub fn unregister(&self, conn_id: &str) {
        if self.connections.remove(conn_id).is_some() {
            self.by_collection.retain(|_, conn_ids| {
                conn_ids.retain(|id| id != conn_id);
                !conn_ids.is_empty()
            });

            tracing::info!(conn_id = %conn_id, "WebSocket connection unregistered");
        }
    }

    /// Subscribe a connection to a collection's snapshots.
    pub fn subscribe(&self, conn_id: &str, collection: &str) {
        let mut conn_ids = self
            .by_collection
            .entry(collection.to_string())
            .or_default();
        if !conn_ids.iter().any(|id| id == conn_id) {
            conn_ids.push(conn_id.to_string());
        }

        tracing::debug!(conn_id = %conn_id, collection = %collection, "subscribed");
    }

    /// Drop one subscription of a connection.
    pub fn unsubscribe(&self, conn_id: &str, collection: &str) {
        if let Some(mut conn_ids) = self.by_collection.get_mut(collection) {
            conn_ids.retain(|id| id != conn_id);
            if conn_ids.is_empty() {
                drop(conn_ids);
                self.by_collection.remove(collection);
            }
        }

        tracing::debug!(conn_id = %conn_id, collection = %collection, "unsubscribed");
    }

    /// Push a fresh snapshot to every subscriber of a collection.
    ///
    /// Returns the number of connections that received it.
    pub fn broadcast_snapshot(&self, collection: &str, documents: Vec<Document>) -> usize {
        let Some(conn_ids) = self.by_collection.get(collection) else {
            return 0;
        };

        let message = ServerMessage::snapshot(collection, documents);
        let mut sent_count = 0;

        for conn_id in conn_ids.iter() {
            if let Some(conn) = self.connections.get(conn_id) {
                if conn.sender.send(message.clone()).is_ok() {
                    sent_count += 1;
                }
            }
        }

        tracing::debug!(
            collection = %collection,
            recipients = sent_count,
            "Broadcast snapshot to subscribers"
        );

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        if let Some(conn) = self.connections.get(conn_id) {
            conn.sender.send(message).is_ok()
        } else {
            false
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of subscribers of a collection.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.by_collection
            .get(collection)
            .map(|conn_ids| conn_ids.len())
            .unwrap_or(0)
    }
}
