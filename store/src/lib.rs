//! # Tether Store
//!
//! A synchronized entity store for client applications: a typed local
//! cache of remote document collections that applies writes optimistically,
//! is kept current by a push-based realtime channel, and derives an
//! append-only audit trail from every mutation.
//!
//! ## Design Principles
//!
//! - **One store per kind**: each [`EntityStore`] owns the `{items,
//!   loading, error}` slice for exactly one collection; consumers read it
//!   through a [`watch`](tokio::sync::watch) receiver and never write it.
//! - **Explicit collaborators**: the gateway and the audit writer are
//!   constructor arguments, not globals, so every store is independently
//!   testable.
//! - **Optimistic, not speculative**: local state changes only after the
//!   remote write has been accepted; a rejected write leaves the cache
//!   untouched.
//! - **Last snapshot wins**: the realtime channel replaces the cached list
//!   wholesale on every push; no merge, no retry, no hidden reconciliation.
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! Records are concrete structs implementing [`Entity`]: identified by a
//! string id, tagged with their remote collection, stamped with ISO-8601
//! `created_at`/`updated_at` times, and paired with a kind-restricted
//! [`EntityPatch`] type so partial updates can only touch known fields.
//! The CRM kinds live in [`kinds`]: [`Account`], [`Contact`], [`Deal`],
//! [`Task`], [`TeamMember`].
//!
//! ### Gateway
//!
//! All remote IO goes through the [`CollectionGateway`] trait:
//! read/write/subscribe primitives over one named collection. The
//! in-process [`MemoryGateway`] implements it with full push support.
//!
//! ### Audit trail
//!
//! Mutations performed with an [`Actor`] append one [`AuditLogEntry`] to
//! the `activities` collection through the [`AuditLogWriter`] — as an
//! independent task whose failure never affects the mutation it describes.
//! [`AuditTrail`] layers the client-side query surface over the loaded log.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_store::{Actor, AuditLogWriter, Deal, DealPatch, EntityStore, MemoryGateway};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tether_store::Result<()> {
//! let gateway: Arc<MemoryGateway> = Arc::new(MemoryGateway::new());
//! let audit = AuditLogWriter::new(gateway.clone());
//! let deals = EntityStore::<Deal>::new(gateway.clone()).with_audit(audit);
//! let actor = Actor::new("user-1", "Dana");
//!
//! // Realtime sync keeps `items` current until the handle is cancelled.
//! let subscription = deals.setup_realtime_sync();
//!
//! let deal = deals
//!     .create(Deal::new("Acme renewal", "acct-1", "Prospecting", 12_000.0), Some(&actor))
//!     .await?;
//!
//! let patch = DealPatch { stage: Some("Closed Won".into()), ..Default::default() };
//! deals.update(&deal.id, patch, Some(&actor)).await?;
//!
//! assert_eq!(deals.get_by_id(&deal.id).unwrap().stage, "Closed Won");
//! subscription.cancel();
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod kinds;
pub mod memory;
pub mod reconcile;
pub mod state;
pub mod store;

// Re-export main types at crate root
pub use audit::{Actor, ActivityKind, AuditLogEntry, AuditLogEntryPatch, AuditLogWriter, AuditTrail};
pub use coordinator::MutationCoordinator;
pub use entity::{now_iso, Entity, EntityPatch};
pub use error::{Error, Result};
pub use gateway::{CollectionGateway, Document, GatewayError, GatewayResult, Subscription};
pub use kinds::{
    Account, AccountPatch, Contact, ContactPatch, Deal, DealPatch, RelatedKind, Task, TaskPatch,
    TaskPriority, TaskStatus, TeamMember, TeamMemberPatch,
};
pub use memory::MemoryGateway;
pub use reconcile::RealtimeReconciler;
pub use state::{CollectionState, StateReceiver};
pub use store::{EntityStore, SeedFn};

/// Type aliases for clarity
pub type EntityId = String;
pub type CollectionName = String;
