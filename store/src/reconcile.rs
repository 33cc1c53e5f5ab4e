//! Realtime reconciliation.
//!
//! The reconciler isolates "a remote push happened" from "what the store
//! does with it". It owns one gateway subscription per attach, decodes
//! pushed documents into the entity kind, and forwards the decoded list.
//! Subscription errors are reported once; there is no automatic retry or
//! re-subscribe — if a consumer wants the channel back it attaches again.

use crate::entity::{from_document, Entity};
use crate::error::Error;
use crate::gateway::{CollectionGateway, Document, Subscription};

/// Bridges the gateway's push stream to a typed snapshot callback.
pub struct RealtimeReconciler;

impl RealtimeReconciler {
    /// Attach to the push stream for `T`'s collection.
    ///
    /// Every pushed snapshot is decoded and handed to `on_items` in full;
    /// the caller decides what to do with it (the stores replace their
    /// list wholesale). Documents that fail to decode are skipped with a
    /// warning rather than poisoning the rest of the snapshot.
    pub fn attach<T, I, E>(gateway: &dyn CollectionGateway, on_items: I, on_error: E) -> Subscription
    where
        T: Entity,
        I: Fn(Vec<T>) + Send + Sync + 'static,
        E: Fn(Error) + Send + Sync + 'static,
    {
        gateway.subscribe(
            T::COLLECTION,
            Box::new(move |documents| on_items(decode_snapshot::<T>(documents))),
            Box::new(move |cause| on_error(Error::Subscription(cause.to_string()))),
        )
    }
}

/// Decode a pushed snapshot, dropping undecodable documents.
pub fn decode_snapshot<T: Entity>(documents: Vec<Document>) -> Vec<T> {
    let mut items = Vec::with_capacity(documents.len());
    for document in documents {
        match from_document::<T>(document) {
            Ok(item) => items.push(item),
            Err(error) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    %error,
                    "skipping undecodable document in pushed snapshot"
                );
            }
        }
    }
    items
}
