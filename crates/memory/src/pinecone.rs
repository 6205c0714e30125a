//! Pinecone vector store over its data-plane REST API.
//!
//! Talks to a single index host (`https://<index>-<project>.svc.<env>.pinecone.io`).
//! Every query is filtered on the `userId` metadata field.

use async_trait::async_trait;
use merlin_config::VectorStoreConfig;
use merlin_core::error::MemoryError;
use merlin_core::memory::{VectorMatch, VectorQuery, VectorRecord, VectorStore};
use serde::Deserialize;
use tracing::{debug, warn};

pub struct PineconeStore {
    index_host: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeStore {
    pub fn new(index_host: impl Into<String>, api_key: impl Into<String>) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| MemoryError::Storage(format!("HTTP client: {e}")))?;

        Ok(Self {
            index_host: index_host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &VectorStoreConfig) -> Result<Self, MemoryError> {
        let host = config
            .index_host
            .clone()
            .ok_or_else(|| MemoryError::Storage("vector_store.index_host is not set".into()))?;
        let key = config
            .api_key
            .clone()
            .ok_or_else(|| MemoryError::Storage("vector_store.api_key is not set".into()))?;
        Self::new(host, key)
    }

    fn query_body(query: &VectorQuery, namespace: &str) -> serde_json::Value {
        serde_json::json!({
            "namespace": namespace,
            "vector": query.vector,
            "topK": query.top_k,
            "includeValues": true,
            "includeMetadata": true,
            "filter": { "userId": { "$eq": query.user_id } },
        })
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, String> {
        let url = format!("{}{}", self.index_host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("{url}: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %url, "Pinecone returned error");
            return Err(format!("{url}: status {status}: {body}"));
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> Result<(), MemoryError> {
        debug!(count = records.len(), namespace, "Pinecone upsert");
        let body = serde_json::json!({ "vectors": records, "namespace": namespace });
        self.post("/vectors/upsert", body)
            .await
            .map_err(MemoryError::Storage)?;
        Ok(())
    }

    async fn query(&self, query: VectorQuery, namespace: &str) -> Result<Vec<VectorMatch>, MemoryError> {
        debug!(top_k = query.top_k, namespace, "Pinecone query");
        let response = self
            .post("/query", Self::query_body(&query, namespace))
            .await
            .map_err(MemoryError::QueryFailed)?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("malformed query response: {e}")))?;
        Ok(parsed.matches)
    }

    async fn delete(&self, id: &str, namespace: &str) -> Result<(), MemoryError> {
        debug!(id, namespace, "Pinecone delete");
        let body = serde_json::json!({ "ids": [id], "namespace": namespace });
        self.post("/vectors/delete", body)
            .await
            .map_err(MemoryError::Storage)?;
        Ok(())
    }
}
