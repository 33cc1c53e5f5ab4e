//! The remote collection gateway seam.
//!
//! A gateway gives read/write/subscribe primitives over named remote
//! collections. The store never talks to the network itself; everything
//! remote goes through this trait, so the backing service stays an opaque
//! collaborator that can be swapped for an in-process one in tests.

use crate::EntityId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw document as it crosses the gateway: the id travels next to the
/// payload, not inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Remote document id
    pub id: EntityId,
    /// The document payload
    pub data: serde_json::Value,
}

impl Document {
    /// Create a document from an id and payload.
    pub fn new(id: impl Into<EntityId>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Errors reported by a gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The remote service could not be reached or answered abnormally.
    #[error("remote collection unavailable: {0}")]
    Unavailable(String),

    /// The write was refused (permissions, validation).
    #[error("write rejected: {0}")]
    Rejected(String),

    /// The addressed document does not exist remotely.
    #[error("document not found: {0}")]
    NotFound(EntityId),

    /// The request payload could not be accepted as document data.
    #[error("malformed document data: {0}")]
    Malformed(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Callback invoked with every pushed collection snapshot.
pub type SnapshotCallback = Box<dyn Fn(Vec<Document>) + Send + Sync>;

/// Callback invoked when the push channel fails.
pub type ErrorCallback = Box<dyn Fn(GatewayError) + Send + Sync>;

/// Read/write/subscribe primitives over one named remote collection.
///
/// All write methods resolve once the remote service has accepted the
/// write. `subscribe` attaches a push listener that delivers the current
/// snapshot immediately and a fresh full snapshot after every remote
/// change, on its own schedule, until the returned handle is cancelled.
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    /// Fetch every document in the collection, in server order.
    async fn get_all(&self, collection: &str) -> GatewayResult<Vec<Document>>;

    /// Add a new document with a server-assigned id.
    async fn add(&self, collection: &str, data: serde_json::Value) -> GatewayResult<EntityId>;

    /// Merge the given fields into an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> GatewayResult<()>;

    /// Create or fully replace a document at a known id.
    async fn set(&self, collection: &str, id: &str, data: serde_json::Value) -> GatewayResult<()>;

    /// Delete a document.
    async fn delete(&self, collection: &str, id: &str) -> GatewayResult<()>;

    /// Attach a push listener for the collection.
    fn subscribe(
        &self,
        collection: &str,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Subscription;
}

/// Cancellation handle for an active push subscription.
///
/// `cancel` consumes the handle, so it can be invoked at most once.
/// Dropping the handle cancels as well, which keeps a listener from
/// outliving the consumer that requested it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a cancellation closure.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that cancels nothing, for subscriptions that failed to
    /// attach in the first place.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Tear down the subscription.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
