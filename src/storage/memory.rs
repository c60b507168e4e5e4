use async_trait::async_trait;
use dashmap::DashMap;

use crate::dht::did::between_right_incl;
use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;
use crate::storage::KvPair;
use crate::storage::Storage;

#[derive(Debug, Default)]
pub struct MemStorage {
    table: DashMap<String, String>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            table: DashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Non-routed read, handy for inspecting a node's local share.
    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get(&self, key: &str) -> Result<String> {
        self.table
            .get(key)
            .map(|v| v.value().clone())
            .ok_or(Error::KeyNotFound)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.table.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.table.remove(key);
        Ok(())
    }

    async fn between(&self, low: Did, high: Did) -> Result<Vec<KvPair>> {
        Ok(self
            .table
            .iter()
            .filter(|entry| {
                between_right_incl(Did::hash_of(entry.key().as_bytes()), low, high)
            })
            .map(|entry| KvPair {
                key: entry.key().clone(),
                value: entry.value().clone(),
            })
            .collect())
    }

    async fn multi_delete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.table.remove(key);
        }
        Ok(())
    }
}
