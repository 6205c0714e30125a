//! CheckpointStore trait: per-thread conversation state.
//!
//! A thread's checkpoint is an ordered, append-only list of messages. The
//! orchestrator reads it before a turn and appends the turn's new messages
//! after it; nothing in the pipeline ever rewrites or deletes a thread.

use crate::error::MemoryError;
use crate::message::ChatMessage;
use async_trait::async_trait;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "sqlite").
    fn name(&self) -> &str;

    /// All turns recorded for the thread, oldest first. Unknown threads are empty.
    async fn get(&self, thread_id: &str) -> Result<Vec<ChatMessage>, MemoryError>;

    /// Append turns to the end of the thread, creating it if needed.
    async fn append(&self, thread_id: &str, turns: Vec<ChatMessage>) -> Result<(), MemoryError>;
}
