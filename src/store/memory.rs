//! In-memory store
//!
//! Backs tests and single-process experimentation. The `entry()` calls hold
//! the shard lock for the whole operation, so `list_pop_head` has the same
//! single-claimant guarantee as Redis LPOP.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;

use crate::store::KvStore;
use crate::types::Result;

/// DashMap-backed key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    lists: DashMap<String, VecDeque<String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }

    async fn list_push_tail(&self, list: &str, value: &str) -> Result<()> {
        self.lists
            .entry(list.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn list_pop_head(&self, list: &str) -> Result<Option<String>> {
        Ok(self.lists.entry(list.to_string()).or_default().pop_front())
    }

    async fn list_len(&self, list: &str) -> Result<u64> {
        Ok(self.lists.get(list).map(|l| l.len() as u64).unwrap_or(0))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_set_delete() {
        let store = MemoryStore::new();

        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));

        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("2".to_string()));

        store.delete(&["a", "missing"]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_fifo_order() {
        let store = MemoryStore::new();

        store.list_push_tail("q", "first").await.unwrap();
        store.list_push_tail("q", "second").await.unwrap();
        store.list_push_tail("q", "third").await.unwrap();
        assert_eq!(store.list_len("q").await.unwrap(), 3);

        assert_eq!(store.list_pop_head("q").await.unwrap(), Some("first".to_string()));
        assert_eq!(store.list_pop_head("q").await.unwrap(), Some("second".to_string()));
        assert_eq!(store.list_pop_head("q").await.unwrap(), Some("third".to_string()));
        assert_eq!(store.list_pop_head("q").await.unwrap(), None);
        assert_eq!(store.list_len("q").await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pop_is_single_claimant() {
        let store = Arc::new(MemoryStore::new());
        store.list_push_tail("q", "x").await.unwrap();
        store.list_push_tail("q", "y").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.list_pop_head("q").await.unwrap() }));
        }

        let mut claimed = Vec::new();
        for handle in handles {
            if let Some(value) = handle.await.unwrap() {
                claimed.push(value);
            }
        }

        claimed.sort();
        assert_eq!(claimed, vec!["x".to_string(), "y".to_string()]);
    }
}
