//! Long-term memory model and the vector-store contract.
//!
//! A [`Memory`] is one saved fact for one user. It never exists without its
//! embedding: the only constructor rejects an empty vector, and vector stores
//! index records by `userId` metadata so every query can be scoped to a
//! single user.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single saved fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub embedding_vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    /// Build a memory, refusing one without an embedding.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
        embedding_vector: Vec<f32>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MemoryError> {
        if embedding_vector.is_empty() {
            return Err(MemoryError::EmbeddingFailed(
                "refusing to build a memory without an embedding vector".into(),
            ));
        }
        Ok(Self {
            id: id.into(),
            user_id: user_id.into(),
            content: content.into(),
            embedding_vector,
            created_at,
        })
    }

    /// The record persisted in the vector store.
    pub fn to_record(&self) -> VectorRecord {
        VectorRecord {
            id: self.id.clone(),
            values: self.embedding_vector.clone(),
            metadata: RecordMetadata {
                user_id: self.user_id.clone(),
                content: self.content.clone(),
                created_at: self.created_at.to_rfc3339(),
            },
        }
    }
}

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

/// One vector with its metadata, as upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// A nearest-neighbour query. `user_id` is mandatory: there is no unscoped
/// query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub user_id: String,
}

/// One query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl VectorMatch {
    /// Rebuild the memory a match refers to. Unparseable timestamps fall back
    /// to now; a match without values keeps an empty vector, since it is read
    /// back, never persisted again.
    pub fn into_memory(self) -> Memory {
        let created_at = DateTime::parse_from_rfc3339(&self.metadata.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Memory {
            id: self.id,
            user_id: self.metadata.user_id,
            content: self.metadata.content,
            embedding_vector: self.values,
            created_at,
        }
    }
}

/// The external vector index.
///
/// Implementations: in-memory (tests, local runs), Pinecone.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "pinecone").
    fn name(&self) -> &str;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> Result<(), MemoryError>;

    /// Return up to `top_k` nearest records whose `userId` equals the query's.
    async fn query(&self, query: VectorQuery, namespace: &str) -> Result<Vec<VectorMatch>, MemoryError>;

    /// Delete a record. Deleting an unknown id succeeds.
    async fn delete(&self, id: &str, namespace: &str) -> Result<(), MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_requires_embedding() {
        let err = Memory::new("m1", "u1", "loves hiking", vec![], Utc::now()).unwrap_err();
        assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    }

    #[test]
    fn record_metadata_uses_camel_case() {
        let memory = Memory::new("m1", "u1", "loves hiking", vec![0.1, 0.2], Utc::now()).unwrap();
        let json = serde_json::to_value(memory.to_record()).unwrap();
        assert_eq!(json["metadata"]["userId"], "u1");
        assert_eq!(json["metadata"]["content"], "loves hiking");
        assert!(json["metadata"]["createdAt"].is_string());
    }

    #[test]
    fn match_rebuilds_memory() {
        let now = Utc::now();
        let memory = Memory::new("m1", "u1", "likes tea", vec![1.0], now).unwrap();
        let record = memory.to_record();
        let hit = VectorMatch {
            id: record.id,
            score: 0.9,
            values: record.values,
            metadata: record.metadata,
        };
        let back = hit.into_memory();
        assert_eq!(back.user_id, "u1");
        assert_eq!(back.content, "likes tea");
        assert_eq!(back.created_at.timestamp(), now.timestamp());
    }
}
