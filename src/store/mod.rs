//! Durable key-value store abstraction
//!
//! Connection tasks share no memory beyond the live socket registry, so all
//! pairing state (the waiting queue and the pair records) goes through this
//! seam. Redis backs production; `MemoryStore` backs tests and single-process
//! experimentation with the same atomicity guarantees.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;

use crate::types::Result;

/// Minimal key-value interface the chat core consumes
///
/// `list_pop_head` must be atomic: under concurrent callers each stored value
/// is observed by exactly one of them. Deleting absent keys is not an error.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete one or more keys
    async fn delete(&self, keys: &[&str]) -> Result<()>;

    /// Append a value to the tail of a list
    async fn list_push_tail(&self, list: &str, value: &str) -> Result<()>;

    /// Atomically remove and return the head of a list
    async fn list_pop_head(&self, list: &str) -> Result<Option<String>>;

    /// Current length of a list
    async fn list_len(&self, list: &str) -> Result<u64>;

    /// Verify the store is reachable
    async fn ping(&self) -> Result<()>;
}
