//! Behavior tests for the synchronized entity store.
//!
//! These cover the store's observable contract end to end against the
//! in-process gateway: optimistic mutations, realtime replacement, the
//! audit trail, and the documented failure modes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tether_store::{
    Actor, ActivityKind, AuditLogWriter, AuditTrail, CollectionGateway, CollectionState, Deal,
    DealPatch, Document, EntityStore, GatewayError, MemoryGateway, StateReceiver,
};
use tokio::time::{sleep, timeout};

fn actor() -> Actor {
    Actor::new("user-1", "Dana Scully")
}

fn store_with_audit(gateway: &Arc<MemoryGateway>) -> EntityStore<Deal> {
    EntityStore::new(gateway.clone())
        .with_audit(AuditLogWriter::new(gateway.clone()))
}

fn plain_store(gateway: &Arc<MemoryGateway>) -> EntityStore<Deal> {
    EntityStore::new(gateway.clone())
}

/// Wait until the watched state satisfies `pred`.
async fn wait_until<F>(rx: &mut StateReceiver<Deal>, pred: F)
where
    F: Fn(&CollectionState<Deal>) -> bool,
{
    timeout(Duration::from_secs(2), async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("state never reached the expected condition");
}

/// Wait until at least `count` audit entries exist, then return them.
async fn wait_for_entries(gateway: &MemoryGateway, count: usize) -> Vec<Document> {
    timeout(Duration::from_secs(2), async {
        loop {
            let documents = gateway.get_all("activities").await.unwrap();
            if documents.len() >= count {
                return documents;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("audit entries did not appear in time")
}

/// Delegates everything to a `MemoryGateway` but refuses every write to
/// the `activities` collection.
struct RejectingTrailGateway {
    inner: Arc<MemoryGateway>,
}

#[async_trait::async_trait]
impl tether_store::CollectionGateway for RejectingTrailGateway {
    async fn get_all(&self, collection: &str) -> tether_store::GatewayResult<Vec<Document>> {
        self.inner.get_all(collection).await
    }

    async fn add(
        &self,
        collection: &str,
        data: serde_json::Value,
    ) -> tether_store::GatewayResult<String> {
        if collection == "activities" {
            return Err(GatewayError::Rejected("trail writes disabled".into()));
        }
        self.inner.add(collection, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> tether_store::GatewayResult<()> {
        self.inner.update(collection, id, patch).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> tether_store::GatewayResult<()> {
        self.inner.set(collection, id, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> tether_store::GatewayResult<()> {
        self.inner.delete(collection, id).await
    }

    fn subscribe(
        &self,
        collection: &str,
        on_snapshot: tether_store::gateway::SnapshotCallback,
        on_error: tether_store::gateway::ErrorCallback,
    ) -> tether_store::Subscription {
        self.inner.subscribe(collection, on_snapshot, on_error)
    }
}

/// Delegates reads and writes but reports every subscription as failed.
struct BrokenPushGateway {
    inner: Arc<MemoryGateway>,
}

#[async_trait::async_trait]
impl tether_store::CollectionGateway for BrokenPushGateway {
    async fn get_all(&self, collection: &str) -> tether_store::GatewayResult<Vec<Document>> {
        self.inner.get_all(collection).await
    }

    async fn add(
        &self,
        collection: &str,
        data: serde_json::Value,
    ) -> tether_store::GatewayResult<String> {
        self.inner.add(collection, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> tether_store::GatewayResult<()> {
        self.inner.update(collection, id, patch).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> tether_store::GatewayResult<()> {
        self.inner.set(collection, id, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> tether_store::GatewayResult<()> {
        self.inner.delete(collection, id).await
    }

    fn subscribe(
        &self,
        _collection: &str,
        _on_snapshot: tether_store::gateway::SnapshotCallback,
        on_error: tether_store::gateway::ErrorCallback,
    ) -> tether_store::Subscription {
        on_error(GatewayError::Unavailable("push channel refused".into()));
        tether_store::Subscription::noop()
    }
}

// ============================================================================
// Create / Update / Delete
// ============================================================================

#[tokio::test]
async fn created_entity_is_retrievable_with_timestamps() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);

    let mut draft = Deal::new("Acme renewal", "acct-1", "Prospecting", 12_000.0);
    draft.probability = 0.25;
    let created = store.create(draft.clone(), None).await.unwrap();

    let cached = store.get_by_id(&created.id).unwrap();
    assert_eq!(cached, created);

    // Same data plus the assigned id and timestamps.
    assert_eq!(cached.name, draft.name);
    assert_eq!(cached.amount, draft.amount);
    assert_eq!(cached.probability, draft.probability);
    assert!(cached.created_at.is_some());
    assert_eq!(cached.created_at, cached.updated_at);
}

#[tokio::test]
async fn update_is_a_merge_not_a_replace() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);

    let mut draft = Deal::new("Acme renewal", "acct-1", "Negotiation", 12_000.0);
    draft.description = "Q3 renewal with upsell".into();
    let created = store.create(draft, None).await.unwrap();

    sleep(Duration::from_millis(5)).await;
    store
        .update(
            &created.id,
            DealPatch {
                stage: Some("Closed Won".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let after = store.get_by_id(&created.id).unwrap();
    assert_eq!(after.stage, "Closed Won");
    assert!(after.updated_at > created.updated_at);

    // Everything else is identical.
    assert_eq!(after.name, created.name);
    assert_eq!(after.amount, created.amount);
    assert_eq!(after.description, created.description);
    assert_eq!(after.created_at, created.created_at);
}

#[tokio::test]
async fn delete_removes_exactly_one_entity() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);

    let keep = store
        .create(Deal::new("Keep", "acct-1", "Prospecting", 100.0), None)
        .await
        .unwrap();
    let drop = store
        .create(Deal::new("Drop", "acct-1", "Prospecting", 200.0), None)
        .await
        .unwrap();

    let before = store.items().len();
    store.delete(&drop.id, None).await.unwrap();

    assert_eq!(store.items().len(), before - 1);
    assert!(store.get_by_id(&drop.id).is_none());
    assert!(store.get_by_id(&keep.id).is_some());
}

#[tokio::test]
async fn double_delete_errors_without_collateral_damage() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);

    let survivor = store
        .create(Deal::new("Survivor", "acct-1", "Prospecting", 100.0), None)
        .await
        .unwrap();
    let target = store
        .create(Deal::new("Target", "acct-1", "Prospecting", 200.0), None)
        .await
        .unwrap();

    store.delete(&target.id, None).await.unwrap();
    let second = store.delete(&target.id, None).await;

    assert!(matches!(
        second,
        Err(tether_store::Error::Gateway(GatewayError::NotFound(_)))
    ));
    assert_eq!(store.items().len(), 1);
    assert!(store.get_by_id(&survivor.id).is_some());
}

// ============================================================================
// Realtime reconciliation
// ============================================================================

#[tokio::test]
async fn pushed_snapshot_replaces_items_wholesale() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);
    let mut state = store.state();

    store
        .create(Deal::new("Local", "acct-1", "Prospecting", 100.0), None)
        .await
        .unwrap();
    let _sub = store.setup_realtime_sync();

    let pushed = vec![
        Document::new(
            "d-10",
            json!({"name": "Remote A", "account_id": "acct-2", "stage": "Negotiation", "amount": 10.0}),
        ),
        Document::new(
            "d-11",
            json!({"name": "Remote B", "account_id": "acct-2", "stage": "Negotiation", "amount": 11.0}),
        ),
    ];
    gateway.push_snapshot("deals", pushed);

    // Membership and order follow the pushed set exactly.
    wait_until(&mut state, |s| {
        s.items.len() == 2 && s.items[0].id == "d-10" && s.items[1].id == "d-11"
    })
    .await;
    assert!(store.get_by_id("d-10").is_some());
    assert!(store.items().iter().all(|d| d.name.starts_with("Remote")));
}

#[tokio::test]
async fn empty_snapshot_overrides_optimistic_create() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);
    let mut state = store.state();

    let created = store
        .create(Deal::new("Acme", "acct-1", "Prospecting", 100.0), None)
        .await
        .unwrap();
    assert_eq!(store.items().len(), 1);

    let _sub = store.setup_realtime_sync();

    // A stale replica that has not seen the create pushes an empty set;
    // last snapshot wins and the optimistic item disappears.
    gateway.push_snapshot("deals", Vec::new());
    wait_until(&mut state, |s| s.items.is_empty()).await;
    assert!(store.get_by_id(&created.id).is_none());
}

#[tokio::test]
async fn realtime_sync_reflects_remote_mutations() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);
    let mut state = store.state();

    let _sub = store.setup_realtime_sync();

    // A write that bypasses this store (another client) still lands.
    gateway
        .set(
            "deals",
            "d-77",
            json!({"name": "Elsewhere", "account_id": "acct-3", "stage": "Prospecting", "amount": 1.0}),
        )
        .await
        .unwrap();

    wait_until(&mut state, |s| s.len() == 1).await;
    assert_eq!(store.get_by_id("d-77").unwrap().name, "Elsewhere");
}

#[tokio::test]
async fn cancelled_subscription_stops_reconciling() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);
    let mut state = store.state();

    let sub = store.setup_realtime_sync();
    gateway
        .set(
            "deals",
            "d-1",
            json!({"name": "First", "account_id": "a", "stage": "s", "amount": 1.0}),
        )
        .await
        .unwrap();
    wait_until(&mut state, |s| s.len() == 1).await;

    sub.cancel();
    gateway
        .set(
            "deals",
            "d-2",
            json!({"name": "Second", "account_id": "a", "stage": "s", "amount": 2.0}),
        )
        .await
        .unwrap();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(store.items().len(), 1);

    // Re-subscribing after cancel picks the current remote state back up.
    let _sub = store.setup_realtime_sync();
    let mut state = store.state();
    wait_until(&mut state, |s| s.len() == 2).await;
}

// ============================================================================
// Audit trail
// ============================================================================

#[tokio::test]
async fn each_acted_mutation_appends_exactly_one_entry() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = store_with_audit(&gateway);
    let actor = actor();

    let created = store
        .create(
            Deal::new("Acme renewal", "acct-1", "Negotiation", 12_000.0),
            Some(&actor),
        )
        .await
        .unwrap();
    let after_create = wait_for_entries(&gateway, 1).await;
    assert_eq!(after_create.len(), 1);
    assert_eq!(after_create[0].data["type"], "create");
    assert_eq!(after_create[0].data["documentRef"], created.id.as_str());
    assert_eq!(after_create[0].data["userId"], "user-1");
    assert_eq!(after_create[0].data["details"]["action"], "deal_created");

    store
        .update(
            &created.id,
            DealPatch {
                stage: Some("Closed Won".into()),
                ..Default::default()
            },
            Some(&actor),
        )
        .await
        .unwrap();
    let after_update = wait_for_entries(&gateway, 2).await;
    assert_eq!(after_update.len(), 2);
    assert_eq!(after_update[1].data["type"], "update");
    assert_eq!(after_update[1].data["details"]["action"], "stage_change");
    assert_eq!(after_update[1].data["details"]["previous_stage"], "Negotiation");
    assert_eq!(after_update[1].data["details"]["new_stage"], "Closed Won");

    store.delete(&created.id, Some(&actor)).await.unwrap();
    let after_delete = wait_for_entries(&gateway, 3).await;
    assert_eq!(after_delete.len(), 3);
    assert_eq!(after_delete[2].data["type"], "delete");
    // The delete entry carries the pre-deletion snapshot.
    assert_eq!(after_delete[2].data["details"]["stage"], "Closed Won");

    // Prior entries were never mutated or removed.
    assert_eq!(after_delete[0], after_create[0]);
    assert_eq!(after_delete[1], after_update[1]);
}

#[tokio::test]
async fn mutations_without_actor_log_nothing() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = store_with_audit(&gateway);

    let created = store
        .create(Deal::new("Quiet", "acct-1", "Prospecting", 1.0), None)
        .await
        .unwrap();
    store
        .update(
            &created.id,
            DealPatch {
                amount: Some(2.0),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    store.delete(&created.id, None).await.unwrap();

    sleep(Duration::from_millis(50)).await;
    let entries = gateway.get_all("activities").await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_mutation() {
    let inner = Arc::new(MemoryGateway::new());
    let gateway = Arc::new(RejectingTrailGateway {
        inner: inner.clone(),
    });
    let store = EntityStore::<Deal>::new(gateway.clone())
        .with_audit(AuditLogWriter::new(gateway.clone()));

    let created = store
        .create(Deal::new("Acme", "acct-1", "Prospecting", 1.0), Some(&actor()))
        .await
        .unwrap();

    // The primary write succeeded even though every trail write fails.
    assert!(store.get_by_id(&created.id).is_some());
    let state = store.state();
    assert!(state.borrow().error.is_none());

    sleep(Duration::from_millis(50)).await;
    let entries = inner.get_all("activities").await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn trail_exposes_the_loaded_log() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = store_with_audit(&gateway);
    let actor = actor();

    let deal = store
        .create(Deal::new("Acme", "acct-1", "Prospecting", 1.0), Some(&actor))
        .await
        .unwrap();
    store.delete(&deal.id, Some(&actor)).await.unwrap();
    wait_for_entries(&gateway, 2).await;

    let trail = AuditTrail::new(gateway.clone());
    trail.store().fetch().await.unwrap();

    assert_eq!(trail.entries_of_kind(ActivityKind::Create).len(), 1);
    assert_eq!(trail.entries_of_kind(ActivityKind::Delete).len(), 1);
    assert_eq!(trail.recent_for_collection("deals", 10).len(), 2);
    assert_eq!(trail.recent_for_collection("accounts", 10).len(), 0);
    assert_eq!(trail.recent(1).len(), 1);
}

// ============================================================================
// Failure surfaces
// ============================================================================

#[tokio::test]
async fn subscription_error_is_recorded_and_items_survive() {
    let inner = Arc::new(MemoryGateway::new());
    let gateway = Arc::new(BrokenPushGateway {
        inner: inner.clone(),
    });
    let store = EntityStore::<Deal>::new(gateway.clone());

    store
        .create(Deal::new("Sticky", "acct-1", "Prospecting", 1.0), None)
        .await
        .unwrap();

    let _sub = store.setup_realtime_sync();

    let state = store.state();
    let state = state.borrow();
    assert!(matches!(state.error, Some(tether_store::Error::Subscription(_))));
    assert_eq!(state.items.len(), 1);
}

#[tokio::test]
async fn failed_update_surfaces_once_and_is_lost() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = plain_store(&gateway);

    let created = store
        .create(Deal::new("Acme", "acct-1", "Prospecting", 1.0), None)
        .await
        .unwrap();

    gateway.fail_next("flaky network");
    let failed = store
        .update(
            &created.id,
            DealPatch {
                amount: Some(9.0),
                ..Default::default()
            },
            None,
        )
        .await;
    assert!(failed.is_err());

    // No retry happened behind the scenes: the remote value is unchanged
    // and so is the cache.
    assert_eq!(store.get_by_id(&created.id).unwrap().amount, 1.0);
    let remote = gateway.get_all("deals").await.unwrap();
    assert_eq!(remote[0].data["amount"], 1.0);

    // The next call starts clean.
    store
        .update(
            &created.id,
            DealPatch {
                amount: Some(9.0),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(store.get_by_id(&created.id).unwrap().amount, 9.0);
    let state = store.state();
    assert!(state.borrow().error.is_none());
}
