//! Semantic long-term memory: save, retrieve (as a grounded answer), delete.
//!
//! Every call embeds its text fresh; nothing is cached. Errors from the
//! embedding, vector-store and completion calls are returned untouched so
//! the tool boundary can decide how to report them.

use chrono::Utc;
use merlin_core::error::MemoryError;
use merlin_core::memory::{Memory, VectorQuery, VectorStore};
use merlin_core::message::ChatMessage;
use merlin_core::provider::{EmbeddingRequest, Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Namespace for memory ids derived from `(userId, content)`.
const MEMORY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d65726c_696e_4d65_8d6f_72795f69645f);

pub struct MemoryService {
    provider: Arc<dyn Provider>,
    store: Arc<dyn VectorStore>,
    namespace: String,
    model: String,
    embedding_model: String,
}

impl MemoryService {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            provider,
            store,
            namespace: "ns1".into(),
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_models(mut self, model: impl Into<String>, embedding_model: impl Into<String>) -> Self {
        self.model = model.into();
        self.embedding_model = embedding_model.into();
        self
    }

    /// Deterministic id for a fact, so re-saving the same fact for the
    /// same user overwrites instead of duplicating.
    pub fn memory_id(user_id: &str, content: &str) -> String {
        Uuid::new_v5(&MEMORY_ID_NAMESPACE, format!("{user_id}\n{content}").as_bytes()).to_string()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MemoryError::EmbeddingFailed("provider returned no embedding".into()))
    }

    /// Embed and persist one fact. `id` defaults to [`Self::memory_id`].
    pub async fn save_memory(
        &self,
        user_id: &str,
        content: &str,
        id: Option<String>,
    ) -> Result<Memory, MemoryError> {
        let embedding = self.embed(content).await?;
        let id = id.unwrap_or_else(|| Self::memory_id(user_id, content));
        let memory = Memory::new(id, user_id, content, embedding, Utc::now())?;

        self.store
            .upsert(vec![memory.to_record()], &self.namespace)
            .await?;

        info!(memory_id = %memory.id, user_id, "Memory saved");
        Ok(memory)
    }

    /// The `k` nearest memories of one user.
    pub async fn nearest_memories(
        &self,
        user_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        let vector = self.embed(query).await?;
        let matches = self
            .store
            .query(
                VectorQuery {
                    vector,
                    top_k: k,
                    user_id: user_id.to_string(),
                },
                &self.namespace,
            )
            .await?;

        Ok(matches
            .into_iter()
            .filter(|m| m.metadata.user_id == user_id)
            .map(|m| m.into_memory())
            .collect())
    }

    /// Answer `query` using only the user's `k` nearest memories.
    pub async fn find_relevant_memories(
        &self,
        user_id: &str,
        query: &str,
        k: usize,
    ) -> Result<String, MemoryError> {
        let memories = self.nearest_memories(user_id, query, k).await?;
        debug!(user_id, found = memories.len(), "Memories retrieved");

        let request = ProviderRequest::new(self.model.clone(), grounded_prompt(&memories, query));
        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }

    /// Remove a memory. Deleting an id that no longer exists succeeds.
    pub async fn delete_memory(&self, id: &str) -> Result<(), MemoryError> {
        self.store.delete(id, &self.namespace).await?;
        info!(memory_id = id, "Memory deleted");
        Ok(())
    }
}

/// Developer guidance for a grounded answer, followed by the question.
pub fn grounded_prompt(memories: &[Memory], query: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(memories.len() + 6);
    messages.push(ChatMessage::developer(
        "You are a helpful personal assistant. The user has stored the following facts:",
    ));
    messages.extend(memories.iter().map(|m| ChatMessage::developer(m.content.clone())));
    messages.push(ChatMessage::developer(
        "Use only these facts to answer the user's question accurately.",
    ));
    messages.push(ChatMessage::developer(
        "If you do not know the answer, simply state that you do not know without adding anything else.",
    ));
    messages.push(ChatMessage::developer(
        "Use the same language that user used in the prompt message. Translate matching fact to the required language if needed.",
    ));
    messages.push(ChatMessage::developer(format!(
        "You have {} memories available. In your response, please include the number of memories you used to answer the question. Even if you do not know the answer, you should still include this number.",
        memories.len()
    )));
    messages.push(ChatMessage::user(query));
    messages
}
