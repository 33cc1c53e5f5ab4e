//! The reactive state slice owned by each store.

use crate::error::Error;
use tokio::sync::watch;

/// The state of one synchronized collection.
///
/// Owned exclusively by one [`EntityStore`](crate::EntityStore); UI
/// consumers read it through a [`watch::Receiver`] and never mutate it
/// directly. At any instant `items` is either the last server-confirmed
/// snapshot or that snapshot plus in-flight optimistic edits not yet
/// reconciled.
#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    /// The cached entities, in insertion/server order. Order is not
    /// guaranteed stable across a realtime reconciliation.
    pub items: Vec<T>,
    /// Whether a fetch or mutation is in flight.
    pub loading: bool,
    /// The most recent failure, if any.
    pub error: Option<Error>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl<T> CollectionState<T> {
    /// Number of cached entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cache holds no entities.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Read-only reactive view of a collection's state.
pub type StateReceiver<T> = watch::Receiver<CollectionState<T>>;
