//! The synchronized entity store.
//!
//! One `EntityStore` instance per entity kind: a typed local cache of one
//! remote collection that applies writes optimistically, can be kept
//! current by the realtime push channel, and derives audit-trail entries
//! from every mutation performed with an actor.
//!
//! Stores are plain values constructed with their collaborators injected;
//! share one across consumers with an `Arc` and hand each consumer a
//! [`StateReceiver`] from [`EntityStore::state`].

use crate::audit::{Actor, AuditLogWriter};
use crate::coordinator::MutationCoordinator;
use crate::entity::{now_iso, patch_to_payload, to_payload, Entity, EntityPatch};
use crate::error::{Error, Result};
use crate::gateway::{CollectionGateway, Document, Subscription};
use crate::reconcile::{decode_snapshot, RealtimeReconciler};
use crate::state::{CollectionState, StateReceiver};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

/// Produces the documents used to backfill an empty collection.
pub type SeedFn<T> = Arc<dyn Fn() -> Vec<T> + Send + Sync>;

/// A typed, synchronized cache of one remote collection.
pub struct EntityStore<T: Entity> {
    gateway: Arc<dyn CollectionGateway>,
    audit: Option<AuditLogWriter>,
    seed: Option<SeedFn<T>>,
    state: Arc<watch::Sender<CollectionState<T>>>,
    coordinator: MutationCoordinator<T>,
}

impl<T: Entity> EntityStore<T> {
    /// Create a store over `T`'s collection with no audit writer.
    pub fn new(gateway: Arc<dyn CollectionGateway>) -> Self {
        let (sender, _) = watch::channel(CollectionState::default());
        let state = Arc::new(sender);
        let coordinator = MutationCoordinator::new(Arc::clone(&state));
        Self {
            gateway,
            audit: None,
            seed: None,
            state,
            coordinator,
        }
    }

    /// Record an audit entry for every mutation that carries an actor.
    pub fn with_audit(mut self, writer: AuditLogWriter) -> Self {
        self.audit = Some(writer);
        self
    }

    /// Backfill the collection with these entities when a fetch observes
    /// it empty. This is a seam into data seeding, not part of the sync
    /// behavior itself.
    pub fn with_seed(mut self, seed: impl Fn() -> Vec<T> + Send + Sync + 'static) -> Self {
        self.seed = Some(Arc::new(seed));
        self
    }

    /// A read-only reactive view of `{items, loading, error}`.
    pub fn state(&self) -> StateReceiver<T> {
        self.state.subscribe()
    }

    /// Current cached entities.
    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// Synchronous lookup in the cache. Never triggers a remote call.
    pub fn get_by_id(&self, id: &str) -> Option<T> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Load the collection from the gateway once.
    ///
    /// On failure the error is recorded in the state, `items` keeps its
    /// prior value, and the error is also returned.
    pub async fn fetch(&self) -> Result<()> {
        self.coordinator.begin();

        let documents = match self.load_documents().await {
            Ok(documents) => documents,
            Err(error) => return Err(self.fail(error)),
        };

        let items = decode_snapshot::<T>(documents);
        self.state.send_modify(|state| {
            state.items = items;
            state.loading = false;
        });
        Ok(())
    }

    async fn load_documents(&self) -> Result<Vec<Document>> {
        let documents = self.gateway.get_all(T::COLLECTION).await?;
        if !documents.is_empty() {
            return Ok(documents);
        }

        let Some(seed) = &self.seed else {
            return Ok(documents);
        };

        tracing::info!(
            collection = T::COLLECTION,
            "collection is empty, backfilling seed data"
        );
        let now = now_iso();
        for mut entity in seed() {
            entity.stamp_created(&now);
            if entity.id().is_empty() {
                entity.set_id(uuid::Uuid::new_v4().to_string());
            }
            let payload = to_payload(&entity)?;
            self.gateway
                .set(T::COLLECTION, entity.id(), payload)
                .await?;
        }

        Ok(self.gateway.get_all(T::COLLECTION).await?)
    }

    /// Create an entity.
    ///
    /// Timestamps are assigned here, the remote write is awaited, and only
    /// then is the new entity appended to `items` — the UI sees it before
    /// any realtime confirmation. Returns the entity with its
    /// server-assigned id.
    pub async fn create(&self, mut data: T, actor: Option<&Actor>) -> Result<T> {
        self.coordinator.begin();

        let now = now_iso();
        data.stamp_created(&now);
        let payload = match to_payload(&data) {
            Ok(payload) => payload,
            Err(error) => return Err(self.fail(error)),
        };

        let optimistic = data.clone();
        let assigned = self
            .coordinator
            .commit(self.gateway.add(T::COLLECTION, payload), |state, id| {
                let mut stored = optimistic;
                stored.set_id(id.clone());
                state.items.push(stored);
            })
            .await?;

        let mut created = data;
        created.set_id(assigned);

        if let (Some(writer), Some(actor)) = (&self.audit, actor) {
            let mut details = created.audit_summary();
            details.insert("action".into(), json!(format!("{}_created", T::NOUN)));
            let _ = writer.record_create(T::COLLECTION, created.id(), actor, details);
        }

        Ok(created)
    }

    /// Merge a partial update into an entity.
    ///
    /// `updated_at` is stamped on the patch, the remote write is awaited,
    /// and the patch is then merged into the matching cached item. When the
    /// id is not cached locally the merge silently no-ops; the remote write
    /// still happens and no phantom entity appears.
    pub async fn update(&self, id: &str, mut patch: T::Patch, actor: Option<&Actor>) -> Result<()> {
        self.coordinator.begin();

        let previous = self.get_by_id(id);
        patch.stamp_updated(&now_iso());
        let payload = match patch_to_payload::<T>(id, &patch) {
            Ok(payload) => payload,
            Err(error) => return Err(self.fail(error)),
        };

        let details = previous.as_ref().map(|prev| patch.audit_delta(prev));
        let target = id.to_string();
        self.coordinator
            .commit(self.gateway.update(T::COLLECTION, id, payload), |state, _| {
                if let Some(item) = state.items.iter_mut().find(|item| item.id() == target) {
                    patch.apply(item);
                }
            })
            .await?;

        if let (Some(writer), Some(actor), Some(details)) = (&self.audit, actor, details) {
            let _ = writer.record_update(T::COLLECTION, id, actor, details);
        }

        Ok(())
    }

    /// Delete an entity.
    ///
    /// The cached value is captured before removal so the audit entry can
    /// carry the pre-deletion snapshot.
    pub async fn delete(&self, id: &str, actor: Option<&Actor>) -> Result<()> {
        self.coordinator.begin();

        let removed = self.get_by_id(id);
        let target = id.to_string();
        self.coordinator
            .commit(self.gateway.delete(T::COLLECTION, id), |state, _| {
                state.items.retain(|item| item.id() != target);
            })
            .await?;

        if let (Some(writer), Some(actor), Some(snapshot)) = (&self.audit, actor, removed) {
            let mut details = snapshot.audit_summary();
            details.insert("action".into(), json!(format!("{}_deleted", T::NOUN)));
            let _ = writer.record_delete(T::COLLECTION, id, actor, details);
        }

        Ok(())
    }

    /// Open the realtime push channel for this collection.
    ///
    /// Every pushed snapshot replaces `items` wholesale — last snapshot
    /// wins. A snapshot that was already in flight when a mutation was
    /// issued can therefore silently supersede the mutation's optimistic
    /// effect until the server reflects it. Subscription errors are
    /// recorded in the state once and leave `items` untouched; there is no
    /// automatic re-subscribe.
    ///
    /// Cancel the returned handle before dropping the store consumer or
    /// before subscribing again, otherwise two listeners write to the same
    /// state.
    pub fn setup_realtime_sync(&self) -> Subscription {
        let on_items = {
            let state = Arc::clone(&self.state);
            move |items: Vec<T>| {
                state.send_modify(|current| {
                    current.items = items;
                    current.loading = false;
                });
            }
        };
        let on_error = {
            let state = Arc::clone(&self.state);
            move |error: Error| {
                tracing::warn!(collection = T::COLLECTION, %error, "realtime sync failed");
                state.send_modify(|current| {
                    current.error = Some(error);
                    current.loading = false;
                });
            }
        };

        RealtimeReconciler::attach::<T, _, _>(self.gateway.as_ref(), on_items, on_error)
    }

    /// Record `error` in the state and hand it back.
    fn fail(&self, error: Error) -> Error {
        let recorded = error.clone();
        self.state.send_modify(|state| {
            state.error = Some(recorded);
            state.loading = false;
        });
        error
    }
}
