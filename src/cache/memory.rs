//! In-process stores backed by a `HashMap`

use super::store::{ContentStore, MetadataRecord, MetadataStore, Payload, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Payloads held in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: RwLock<HashMap<String, Payload>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get(&self, identifier: &str) -> Result<Option<Payload>, StoreError> {
        Ok(self.entries.read().await.get(identifier).cloned())
    }

    async fn put(&self, identifier: &str, payload: Payload) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(identifier.to_string(), payload);
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(identifier).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// Fetch timestamps held in memory
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<String, MetadataRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, identifier: &str) -> Result<Option<MetadataRecord>, StoreError> {
        Ok(self.records.read().await.get(identifier).copied())
    }

    async fn put(&self, identifier: &str, record: MetadataRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(identifier.to_string(), record);
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(identifier).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}
