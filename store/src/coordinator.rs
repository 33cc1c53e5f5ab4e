//! Sequencing of optimistic mutations.
//!
//! Every create/update/delete follows the same two-step protocol: await
//! the remote write, then apply the matching local state change. The local
//! apply is optimistic only in the sense that it does not wait for the
//! realtime channel to confirm the write; it never runs before the remote
//! call has resolved, so a rejected write leaves `items` untouched.

use crate::error::{Error, Result};
use crate::gateway::GatewayResult;
use crate::state::CollectionState;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Runs the remote-write-then-local-apply sequence against one store's
/// state channel.
pub struct MutationCoordinator<T> {
    state: Arc<watch::Sender<CollectionState<T>>>,
}

impl<T> MutationCoordinator<T> {
    pub fn new(state: Arc<watch::Sender<CollectionState<T>>>) -> Self {
        Self { state }
    }

    /// Mark the start of a remote call: loading on, stale error cleared.
    pub fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    /// Await `write`; on success apply `mutate` to the state and clear
    /// `loading`. On failure record the error, clear `loading`, leave
    /// `items` untouched and rethrow. There is no retry and no partial
    /// recovery: a failed mutation is surfaced once and otherwise lost.
    pub async fn commit<R, W, F>(&self, write: W, mutate: F) -> Result<R>
    where
        W: Future<Output = GatewayResult<R>>,
        F: FnOnce(&mut CollectionState<T>, &R),
    {
        match write.await {
            Ok(outcome) => {
                self.state.send_modify(|state| {
                    mutate(state, &outcome);
                    state.loading = false;
                });
                Ok(outcome)
            }
            Err(cause) => {
                let error = Error::Gateway(cause);
                let recorded = error.clone();
                self.state.send_modify(|state| {
                    state.error = Some(recorded);
                    state.loading = false;
                });
                Err(error)
            }
        }
    }
}
