//! Error types for the Merlin domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Merlin operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Job intake ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Structured data service ---
    #[error("Structured data error: {0}")]
    StructuredData(#[from] StructuredDataError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- User directory ---
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A queue payload that does not match the job schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("missing or empty field: {0}")]
    MissingField(&'static str),

    #[error("schema mismatch: {0}")]
    Schema(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl From<ProviderError> for MemoryError {
    fn from(err: ProviderError) -> Self {
        MemoryError::CompletionFailed(err.to_string())
    }
}

/// Failures talking to the signed parameter/measurement REST service.
#[derive(Debug, Error)]
pub enum StructuredDataError {
    #[error("API Error Detected. Url: {url}. Status: {status}. Data: {body}")]
    Api { url: String, status: u16, body: String },

    #[error("Network Error Detected. Url: {url}")]
    Network { url: String },

    #[error("Unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("HTTP client could not be built: {0}")]
    Client(String),
}

/// Reply delivery failures. Always carries the endpoint that failed.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {endpoint}: {reason}")]
    DeliveryFailed { endpoint: String, reason: String },

    #[error("Platform rejected request to {endpoint} (status {status}): {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool not available: {0}")]
    Unavailable(String),
}

/// Failures of the user directory itself (not "user not found").
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn structured_data_error_names_the_endpoint() {
        let err = StructuredDataError::Api {
            url: "https://svc.test/api/parameters".into(),
            status: 500,
            body: "{\"error\":\"boom\"}".into(),
        };
        let text = err.to_string();
        assert!(text.contains("https://svc.test/api/parameters"));
        assert!(text.contains("500"));
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = Error::from(ValidationError::MissingField("chatId"));
        assert!(err.to_string().contains("chatId"));
    }

    #[test]
    fn provider_error_converts_into_memory_error() {
        let err: MemoryError = ProviderError::Network("connection reset".into()).into();
        assert!(matches!(err, MemoryError::CompletionFailed(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
