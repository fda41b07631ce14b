//! Waiting queue
//!
//! Durable FIFO of guests who connected while nobody was available to pair
//! with. Entries are identifiers only; whether the owner is still alive is
//! checked against the session registry at claim time, since a guest may
//! close while waiting and leave its entry behind.

use std::sync::Arc;

use crate::chat::{GuestId, WAIT_LIST_KEY};
use crate::store::KvStore;
use crate::types::Result;

/// FIFO of unmatched guest identifiers
#[derive(Clone)]
pub struct WaitingQueue {
    store: Arc<dyn KvStore>,
}

impl WaitingQueue {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Append a guest to the tail of the queue
    pub async fn enqueue(&self, guest: &GuestId) -> Result<()> {
        self.store.list_push_tail(WAIT_LIST_KEY, guest.as_str()).await
    }

    /// Claim the oldest waiting guest, if any
    ///
    /// Single atomic pop: under concurrent connects, each waiting entry is
    /// claimed by exactly one caller.
    pub async fn try_dequeue(&self) -> Result<Option<GuestId>> {
        Ok(self.store.list_pop_head(WAIT_LIST_KEY).await?.map(GuestId::from))
    }

    /// Number of entries currently queued
    pub async fn len(&self) -> Result<u64> {
        self.store.list_len(WAIT_LIST_KEY).await
    }
}
