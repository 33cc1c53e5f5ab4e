//! The append-only audit trail.
//!
//! Every create/update/delete performed with an actor derives one
//! immutable [`AuditLogEntry`] in the `activities` collection. Writing the
//! entry is best-effort and fire-and-forget: it runs as its own task,
//! failures go to the diagnostic log, and the primary mutation never waits
//! on it or rolls back because of it.

use crate::entity::{now_iso, to_payload, Entity, EntityPatch};
use crate::gateway::CollectionGateway;
use crate::store::EntityStore;
use crate::{CollectionName, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Who performed a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user id
    pub id: String,
    /// Display name recorded alongside the id
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// What a trail entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Create,
    Update,
    Delete,
    View,
}

/// One immutable record of "who did what to which document".
///
/// Wire field names are camelCase, matching the trail format the rest of
/// the system reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: EntityId,
    /// Client-stamped ISO-8601 time of the mutation.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Collection the affected document belongs to.
    #[serde(rename = "collectionName")]
    pub collection_name: CollectionName,
    /// Id of the affected document.
    #[serde(rename = "documentRef")]
    pub document_ref: EntityId,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Free-form snapshot of the change, minimized per entity kind.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl AuditLogEntry {
    /// Build an unsaved entry stamped with the current time.
    pub fn new(
        kind: ActivityKind,
        collection_name: impl Into<CollectionName>,
        document_ref: impl Into<EntityId>,
        actor: &Actor,
        details: Map<String, Value>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            timestamp: now_iso(),
            kind,
            collection_name: collection_name.into(),
            document_ref: document_ref.into(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            details,
        }
    }
}

/// Entries are append-only; the patch exists for the rare explicit edit
/// of an entry's free-form details.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditLogEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl Entity for AuditLogEntry {
    const COLLECTION: &'static str = "activities";
    const NOUN: &'static str = "activity";
    type Patch = AuditLogEntryPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn stamp_created(&mut self, now: &str) {
        if self.timestamp.is_empty() {
            self.timestamp = now.to_string();
        }
    }

    fn stamp_updated(&mut self, _now: &str) {
        // The trail keeps the original mutation time.
    }

    fn audit_summary(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".into(), json!(self.kind));
        map.insert("collectionName".into(), json!(self.collection_name));
        map.insert("documentRef".into(), json!(self.document_ref));
        map
    }
}

impl EntityPatch<AuditLogEntry> for AuditLogEntryPatch {
    fn apply(&self, target: &mut AuditLogEntry) {
        if let Some(details) = &self.details {
            target.details = details.clone();
        }
    }

    fn stamp_updated(&mut self, _now: &str) {}

    fn audit_delta(&self, previous: &AuditLogEntry) -> Map<String, Value> {
        previous.audit_summary()
    }
}

/// Best-effort writer appending one entry per mutation.
#[derive(Clone)]
pub struct AuditLogWriter {
    gateway: Arc<dyn CollectionGateway>,
}

impl AuditLogWriter {
    pub fn new(gateway: Arc<dyn CollectionGateway>) -> Self {
        Self { gateway }
    }

    /// Append one entry as an independent task.
    ///
    /// Returns the task handle so callers that care (tests, mostly) can
    /// await the outcome: `Some(id)` once the entry was stored, `None` if
    /// the write failed. The failure is logged and never propagated; the
    /// mutation the entry describes already succeeded on its own.
    pub fn record(
        &self,
        kind: ActivityKind,
        collection_name: &str,
        document_ref: &str,
        actor: &Actor,
        details: Map<String, Value>,
    ) -> JoinHandle<Option<EntityId>> {
        let entry = AuditLogEntry::new(kind, collection_name, document_ref, actor, details);
        let gateway = Arc::clone(&self.gateway);

        tokio::spawn(async move {
            let payload = match to_payload(&entry) {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::error!(%error, "could not encode audit entry");
                    return None;
                }
            };

            match gateway.add(AuditLogEntry::COLLECTION, payload).await {
                Ok(id) => {
                    tracing::debug!(
                        kind = ?entry.kind,
                        collection = %entry.collection_name,
                        document = %entry.document_ref,
                        "activity logged"
                    );
                    Some(id)
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to write audit entry");
                    None
                }
            }
        })
    }

    pub fn record_create(
        &self,
        collection_name: &str,
        document_ref: &str,
        actor: &Actor,
        details: Map<String, Value>,
    ) -> JoinHandle<Option<EntityId>> {
        self.record(
            ActivityKind::Create,
            collection_name,
            document_ref,
            actor,
            details,
        )
    }

    pub fn record_update(
        &self,
        collection_name: &str,
        document_ref: &str,
        actor: &Actor,
        details: Map<String, Value>,
    ) -> JoinHandle<Option<EntityId>> {
        self.record(
            ActivityKind::Update,
            collection_name,
            document_ref,
            actor,
            details,
        )
    }

    pub fn record_delete(
        &self,
        collection_name: &str,
        document_ref: &str,
        actor: &Actor,
        details: Map<String, Value>,
    ) -> JoinHandle<Option<EntityId>> {
        self.record(
            ActivityKind::Delete,
            collection_name,
            document_ref,
            actor,
            details,
        )
    }

    pub fn record_view(
        &self,
        collection_name: &str,
        document_ref: &str,
        actor: &Actor,
        details: Map<String, Value>,
    ) -> JoinHandle<Option<EntityId>> {
        self.record(
            ActivityKind::View,
            collection_name,
            document_ref,
            actor,
            details,
        )
    }
}

/// The loaded trail with its client-side query surface.
///
/// Queries run over the in-memory log held by the underlying store, not
/// against the remote service; call [`EntityStore::fetch`] or attach
/// realtime sync first.
pub struct AuditTrail {
    store: EntityStore<AuditLogEntry>,
}

impl AuditTrail {
    pub fn new(gateway: Arc<dyn CollectionGateway>) -> Self {
        Self {
            store: EntityStore::new(gateway),
        }
    }

    /// The underlying synchronized store (fetch, realtime sync, state).
    pub fn store(&self) -> &EntityStore<AuditLogEntry> {
        &self.store
    }

    /// Look up one entry by id.
    pub fn entry(&self, id: &str) -> Option<AuditLogEntry> {
        self.store.get_by_id(id)
    }

    /// All loaded entries of one kind.
    pub fn entries_of_kind(&self, kind: ActivityKind) -> Vec<AuditLogEntry> {
        self.store
            .items()
            .into_iter()
            .filter(|entry| entry.kind == kind)
            .collect()
    }

    /// The `limit` most recent entries, newest first. ISO timestamps in a
    /// single format sort lexicographically.
    pub fn recent(&self, limit: usize) -> Vec<AuditLogEntry> {
        let mut entries = self.store.items();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }

    /// The `limit` most recent entries touching one collection.
    pub fn recent_for_collection(&self, collection_name: &str, limit: usize) -> Vec<AuditLogEntry> {
        let mut entries: Vec<_> = self
            .store
            .items()
            .into_iter()
            .filter(|entry| entry.collection_name == collection_name)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }
}
