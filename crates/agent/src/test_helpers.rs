//! Shared test helpers for orchestrator and recovery tests.

use async_trait::async_trait;
use merlin_core::error::ProviderError;
use merlin_core::message::{ChatMessage, MessageToolCall};
use merlin_core::provider::*;
use merlin_core::user::User;
use merlin_memory::{InMemoryCheckpointStore, InMemoryVectorStore, MemoryService};
use merlin_tools::ToolRegistry;
use std::sync::{Arc, Mutex};

/// A mock provider that returns a sequence of scripted outcomes.
///
/// Each call to `complete` returns the next outcome in the queue; once the
/// script runs out every call fails with a network error.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![make_tool_call_response(tool_calls, ""), make_text_response(answer)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ProviderError::Network("no more scripted responses".into()));
        }
        responses.remove(0)
    }
}

/// Memory-side provider: hashes words into an embedding and answers
/// retrieval prompts by listing the facts it was shown.
pub struct EchoMemoryProvider;

#[async_trait]
impl Provider for EchoMemoryProvider {
    fn name(&self) -> &str {
        "echo_memory"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = request.messages.len();
        let facts: Vec<String> = request.messages[1..n.saturating_sub(5).max(1)]
            .iter()
            .map(|m| m.content.clone())
            .collect();
        Ok(make_text_response(&format!(
            "Facts: {}. Memories used: {}",
            facts.join("; "),
            facts.len()
        )))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let embeddings = request
            .inputs
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 32];
                for word in text.split_whitespace() {
                    let bucket = word.bytes().map(|b| b as usize).sum::<usize>() % 31;
                    v[bucket] += 1.0;
                }
                v[31] = 0.01;
                v
            })
            .collect();
        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
            usage: None,
        })
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: ChatMessage::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut response = make_text_response(thought);
    response.message.tool_calls = tool_calls;
    response
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

pub fn test_user() -> User {
    User {
        id: "u1".into(),
        external_id: "100".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
    }
}

/// Memory-only registry over fresh in-memory stores.
pub fn memory_tools() -> (Arc<ToolRegistry>, Arc<InMemoryVectorStore>) {
    let store = Arc::new(InMemoryVectorStore::new());
    let memory = Arc::new(MemoryService::new(Arc::new(EchoMemoryProvider), store.clone()));
    (Arc::new(ToolRegistry::new(memory)), store)
}

pub fn checkpoints() -> Arc<InMemoryCheckpointStore> {
    Arc::new(InMemoryCheckpointStore::new())
}
