//! In-memory vector and checkpoint stores, for tests and local runs.

use crate::vector;
use async_trait::async_trait;
use merlin_core::checkpoint::CheckpointStore;
use merlin_core::error::MemoryError;
use merlin_core::memory::{VectorMatch, VectorQuery, VectorRecord, VectorStore};
use merlin_core::message::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Brute-force cosine store: namespace -> records in insertion order.
pub struct InMemoryVectorStore {
    namespaces: Arc<RwLock<HashMap<String, Vec<VectorRecord>>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of records in a namespace.
    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace).await == 0
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> Result<(), MemoryError> {
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            match entries.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => entries.push(record),
            }
        }
        Ok(())
    }

    async fn query(&self, query: VectorQuery, namespace: &str) -> Result<Vec<VectorMatch>, MemoryError> {
        let namespaces = self.namespaces.read().await;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(vector::nearest(entries, &query.vector, &query.user_id, query.top_k))
    }

    async fn delete(&self, id: &str, namespace: &str) -> Result<(), MemoryError> {
        if let Some(entries) = self.namespaces.write().await.get_mut(namespace) {
            entries.retain(|r| r.id != id);
        }
        Ok(())
    }
}

/// Process-lifetime checkpoint store keyed by thread id.
pub struct InMemoryCheckpointStore {
    threads: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, thread_id: &str) -> Result<Vec<ChatMessage>, MemoryError> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, thread_id: &str, turns: Vec<ChatMessage>) -> Result<(), MemoryError> {
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .extend(turns);
        Ok(())
    }
}
