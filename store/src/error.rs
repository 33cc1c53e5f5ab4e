//! Error types for the Tether store.

use crate::gateway::GatewayError;
use crate::EntityId;
use thiserror::Error;

/// All possible errors from a synchronized store.
///
/// The error is `Clone` because the most recent failure is also recorded
/// inside [`CollectionState`](crate::CollectionState) for UI consumers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A remote read or write failed.
    #[error("gateway request failed: {0}")]
    Gateway(#[from] GatewayError),

    /// The realtime push channel failed. Reported once; the channel is not
    /// re-established automatically.
    #[error("realtime subscription failed: {0}")]
    Subscription(String),

    /// A document could not be encoded to, or decoded from, its wire form.
    #[error("invalid document {id}: {reason}")]
    InvalidDocument { id: EntityId, reason: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
