//! Domain event system: decoupled observation of the pipeline.
//!
//! Events are published when something interesting happens in a turn.
//! Subscribers (log shippers, tests) react without the publisher knowing
//! about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A job passed validation and entered the pipeline
    JobAccepted {
        chat_id: String,
        thread_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed inside a turn
    ToolExecuted {
        thread_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The orchestrator produced a final answer
    ResponseGenerated {
        thread_id: String,
        model: String,
        steps: u32,
        timestamp: DateTime<Utc>,
    },

    /// The primary invocation failed and the recovery path took over
    RecoveryTriggered {
        thread_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// Replies were delivered to the chat platform
    RepliesDispatched {
        chat_id: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
