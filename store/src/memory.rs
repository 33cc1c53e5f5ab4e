//! In-process gateway implementation.
//!
//! `MemoryGateway` keeps every collection as an ordered document list and
//! fans full snapshots out to subscribers after each mutation, mirroring
//! the push behavior of the hosted document service. It backs the test
//! suites and works as a server-less gateway for demos.
//!
//! Subscriptions spawn a forwarding task, so a Tokio runtime must be
//! running when `subscribe` is called.

use crate::gateway::{
    CollectionGateway, Document, ErrorCallback, GatewayError, GatewayResult, SnapshotCallback,
    Subscription,
};
use crate::{CollectionName, EntityId};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Mutex;
use tokio::sync::broadcast;

const PUSH_BUFFER: usize = 32;

struct CollectionSlot {
    documents: Vec<Document>,
    push: broadcast::Sender<Vec<Document>>,
}

impl CollectionSlot {
    fn new() -> Self {
        let (push, _) = broadcast::channel(PUSH_BUFFER);
        Self {
            documents: Vec::new(),
            push,
        }
    }

    fn broadcast(&self) {
        // No receivers is fine; the send just reports zero deliveries.
        let _ = self.push.send(self.documents.clone());
    }
}

/// An in-memory remote collection store with push support.
#[derive(Default)]
pub struct MemoryGateway {
    collections: DashMap<CollectionName, CollectionSlot>,
    fault: Mutex<Option<GatewayError>>,
}

impl Default for CollectionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next gateway call fail with an `Unavailable` error.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fault.lock().unwrap() = Some(GatewayError::Unavailable(message.into()));
    }

    /// Make the next gateway call fail with a specific error.
    pub fn fail_next_with(&self, error: GatewayError) {
        *self.fault.lock().unwrap() = Some(error);
    }

    /// Deliver an arbitrary snapshot to the collection's subscribers
    /// without touching the stored documents. Simulates a lagging replica
    /// pushing state the latest writes are not part of.
    pub fn push_snapshot(&self, collection: &str, documents: Vec<Document>) {
        let slot = self
            .collections
            .entry(collection.to_string())
            .or_default();
        let _ = slot.push.send(documents);
    }

    /// Number of documents currently stored in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|slot| slot.documents.len())
            .unwrap_or(0)
    }

    fn take_fault(&self) -> Option<GatewayError> {
        self.fault.lock().unwrap().take()
    }
}

#[async_trait]
impl CollectionGateway for MemoryGateway {
    async fn get_all(&self, collection: &str) -> GatewayResult<Vec<Document>> {
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        Ok(self
            .collections
            .get(collection)
            .map(|slot| slot.documents.clone())
            .unwrap_or_default())
    }

    async fn add(&self, collection: &str, data: Value) -> GatewayResult<EntityId> {
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let mut slot = self
            .collections
            .entry(collection.to_string())
            .or_default();
        slot.documents.push(Document::new(id.clone(), data));
        slot.broadcast();
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> GatewayResult<()> {
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let fields = match patch {
            Value::Object(fields) => fields,
            other => {
                return Err(GatewayError::Malformed(format!(
                    "update payload must be an object, got {other}"
                )))
            }
        };

        let mut slot = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        let document = slot
            .documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;

        match document.data.as_object_mut() {
            Some(object) => {
                for (key, value) in fields {
                    object.insert(key, value);
                }
            }
            None => document.data = Value::Object(fields),
        }
        slot.broadcast();
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> GatewayResult<()> {
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let mut slot = self
            .collections
            .entry(collection.to_string())
            .or_default();
        match slot.documents.iter_mut().find(|doc| doc.id == id) {
            Some(document) => document.data = data,
            None => slot.documents.push(Document::new(id, data)),
        }
        slot.broadcast();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> GatewayResult<()> {
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let mut slot = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        let before = slot.documents.len();
        slot.documents.retain(|doc| doc.id != id);
        if slot.documents.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        slot.broadcast();
        Ok(())
    }

    fn subscribe(
        &self,
        collection: &str,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Subscription {
        let (initial, mut receiver) = {
            let slot = self
                .collections
                .entry(collection.to_string())
                .or_default();
            (slot.documents.clone(), slot.push.subscribe())
        };

        let handle = tokio::spawn(async move {
            // The push channel delivers the current contents immediately,
            // then every subsequent snapshot.
            on_snapshot(initial);
            loop {
                match receiver.recv().await {
                    Ok(snapshot) => on_snapshot(snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "push subscriber lagged, skipping to newest");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        on_error(GatewayError::Unavailable("push channel closed".into()));
                        break;
                    }
                }
            }
        });

        Subscription::new(move || handle.abort())
    }
}
