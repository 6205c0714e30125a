//! LLM-backed cleanup of tool inputs.
//!
//! Users say "please remember that I like tea" or "find where I mentioned
//! my blood type"; the memory store should see "I like tea" and "blood type".

use merlin_core::error::ProviderError;
use merlin_core::message::ChatMessage;
use merlin_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::debug;

const MEMORY_TEXT_INSTRUCTIONS: &str = "You are a text-cleaning assistant.
The user will give you a phrase that might contain filler words like \"запомни\", \"please remember\", or \"помни\".
Your task:
1) remove these filler words,
2) return only the essential statement,
3) no explanations, no extra text, only the cleaned statement.";

const SEARCH_QUERY_INSTRUCTIONS: &str = "You are a query-cleaning assistant.
The user will provide a search request that might contain filler words like \"покажи\", \"найди\", \"where did I mention\", or \"retrieve\".
Your task:
1) remove these filler words or meta instructions,
2) return only the essential query keywords,
3) do not add any extra text or explanations.";

pub struct TextCleaner {
    provider: Arc<dyn Provider>,
    model: String,
}

impl TextCleaner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Strip "remember that"-style filler from a fact.
    pub async fn extract_memory_text(&self, text: &str) -> Result<String, ProviderError> {
        self.clean(MEMORY_TEXT_INSTRUCTIONS, text).await
    }

    /// Strip "find"/"show me"-style meta instructions from a search request.
    pub async fn extract_search_query(&self, text: &str) -> Result<String, ProviderError> {
        self.clean(SEARCH_QUERY_INSTRUCTIONS, text).await
    }

    async fn clean(&self, instructions: &str, text: &str) -> Result<String, ProviderError> {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![ChatMessage::developer(instructions), ChatMessage::user(text)],
        );
        let response = self.provider.complete(request).await?;
        let cleaned = response.message.content.trim();

        if cleaned.is_empty() {
            debug!("Cleaner returned nothing, keeping original text");
            return Ok(text.to_string());
        }
        debug!(original = text, cleaned, "Text cleaned");
        Ok(cleaned.to_string())
    }

    /// True when `messages` is a cleaning request produced by this type.
    pub fn is_cleaning_request(messages: &[ChatMessage]) -> bool {
        messages.first().is_some_and(|m| {
            m.content == MEMORY_TEXT_INSTRUCTIONS || m.content == SEARCH_QUERY_INSTRUCTIONS
        })
    }
}
