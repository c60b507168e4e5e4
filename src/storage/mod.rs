//! Storage interface consumed by the ring node, and its in-memory
//! implementation.

pub mod memory;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::error::Result;
pub use crate::storage::memory::MemStorage;

/// One stored record, as it crosses the RPC boundary during handoff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    pub key: String,
    pub value: String,
}

/// Local key-value store behind the ring node. Any implementation can
/// be substituted; the node only needs these five operations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a value. Missing keys are [crate::error::Error::KeyNotFound].
    async fn get(&self, key: &str) -> Result<String>;

    /// Store a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All records whose key hashes into the circular interval
    /// (low, high]. This is what key handoff moves between members.
    async fn between(&self, low: Did, high: Did) -> Result<Vec<KvPair>>;

    /// Remove a batch of keys.
    async fn multi_delete(&self, keys: &[String]) -> Result<()>;
}
