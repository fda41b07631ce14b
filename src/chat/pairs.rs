//! Pair ledger
//!
//! An active session is two point records in the durable store, `a -> b` and
//! `b -> a`, written as separate operations. A crash between the two writes
//! can leave a one-sided record, so `lookup` verifies the reverse direction
//! and treats anything one-sided as "no partner". Teardown deletes both keys
//! in one call; deleting absent keys is not an error.

use std::sync::Arc;

use crate::chat::GuestId;
use crate::store::KvStore;
use crate::types::Result;

/// Symmetric pair records keyed by guest identifier
#[derive(Clone)]
pub struct PairStore {
    store: Arc<dyn KvStore>,
}

impl PairStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Record `a` and `b` as partners
    pub async fn pair(&self, a: &GuestId, b: &GuestId) -> Result<()> {
        self.store.set(a.as_str(), b.as_str()).await?;
        self.store.set(b.as_str(), a.as_str()).await
    }

    /// Current partner of `guest`, if the pairing is intact in both directions
    pub async fn lookup(&self, guest: &GuestId) -> Result<Option<GuestId>> {
        let Some(partner) = self.store.get(guest.as_str()).await? else {
            return Ok(None);
        };

        match self.store.get(&partner).await? {
            Some(back) if back == guest.as_str() => Ok(Some(GuestId::from(partner))),
            _ => Ok(None),
        }
    }

    /// Delete both directions of a pairing
    pub async fn unpair(&self, a: &GuestId, b: &GuestId) -> Result<()> {
        self.store.delete(&[a.as_str(), b.as_str()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tokio_test::assert_ok;

    fn pair_store() -> (PairStore, Arc<dyn KvStore>) {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        (PairStore::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_pair_and_lookup_symmetric() {
        let (pairs, _) = pair_store();
        let a = GuestId::mint();
        let b = GuestId::mint();

        assert_ok!(pairs.pair(&a, &b).await);
        assert_eq!(pairs.lookup(&a).await.unwrap(), Some(b.clone()));
        assert_eq!(pairs.lookup(&b).await.unwrap(), Some(a.clone()));
    }

    #[tokio::test]
    async fn test_lookup_unpaired() {
        let (pairs, _) = pair_store();
        assert_eq!(pairs.lookup(&GuestId::mint()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_one_sided_record_reads_as_absent() {
        let (pairs, store) = pair_store();
        let a = GuestId::mint();
        let b = GuestId::mint();

        // only one direction written, as after a crash mid-pair
        store.set(a.as_str(), b.as_str()).await.unwrap();
        assert_eq!(pairs.lookup(&a).await.unwrap(), None);
        assert_eq!(pairs.lookup(&b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reverse_pointing_elsewhere_reads_as_absent() {
        let (pairs, store) = pair_store();
        let a = GuestId::mint();
        let b = GuestId::mint();
        let c = GuestId::mint();

        store.set(a.as_str(), b.as_str()).await.unwrap();
        store.set(b.as_str(), c.as_str()).await.unwrap();
        assert_eq!(pairs.lookup(&a).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unpair_clears_both() {
        let (pairs, store) = pair_store();
        let a = GuestId::mint();
        let b = GuestId::mint();

        pairs.pair(&a, &b).await.unwrap();
        pairs.unpair(&a, &b).await.unwrap();
        assert_eq!(store.get(a.as_str()).await.unwrap(), None);
        assert_eq!(store.get(b.as_str()).await.unwrap(), None);

        // unpairing again is harmless
        assert_ok!(pairs.unpair(&a, &b).await);
    }
}
