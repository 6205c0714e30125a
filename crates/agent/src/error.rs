use merlin_core::error::{MemoryError, ProviderError};
use thiserror::Error;

/// Why a turn produced no final answer.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Completion failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Checkpoint store failed: {0}")]
    Checkpoint(#[from] MemoryError),

    #[error("No final answer after {steps} steps")]
    StepLimit { steps: u32 },

    #[error("Model returned an empty final answer")]
    EmptyResponse,
}
