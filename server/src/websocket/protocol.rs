//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.

use serde::{Deserialize, Serialize};
use tether_store::Document;

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving snapshots for a collection.
    Subscribe {
        /// Collection to watch
        collection: String,
    },

    /// Stop receiving snapshots for a collection.
    Unsubscribe {
        /// Collection to stop watching
        collection: String,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full contents of a collection. Sent immediately on subscribe and
    /// after every mutation of the collection.
    Snapshot {
        /// The collection this snapshot belongs to
        collection: String,
        /// Every document, in server order
        documents: Vec<Document>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Create a snapshot message.
    pub fn snapshot(collection: impl Into<String>, documents: Vec<Document>) -> Self {
        ServerMessage::Snapshot {
            collection: collection.into(),
            documents,
        }
    }
}
