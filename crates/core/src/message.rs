//! Chat message domain types.
//!
//! These are the value objects that flow through the whole pipeline:
//! a job becomes a user message, the orchestrator surrounds it with developer
//! guidance and thread history, and the provider answers with assistant
//! messages (optionally carrying tool calls).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operator-authored guidance (policy, user context, fallback instructions)
    Developer,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a developer guidance message.
    pub fn developer(content: impl Into<String>) -> Self {
        Self::with_role(Role::Developer, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// True for an assistant message that answers instead of calling tools.
    pub fn is_final_answer(&self) -> bool {
        self.role == Role::Assistant && self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = ChatMessage::user("Hello, Merlin!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, Merlin!");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn developer_role_serializes_lowercase() {
        let msg = ChatMessage::developer("Follow the policy.");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "developer");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = ChatMessage::tool_result("call_1", "Memory saved successfully!");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(!msg.is_final_answer());
    }

    #[test]
    fn assistant_with_tool_calls_is_not_final() {
        let mut msg = ChatMessage::assistant("");
        assert!(msg.is_final_answer());
        msg.tool_calls.push(MessageToolCall {
            id: "call_1".into(),
            name: "saveMemory".into(),
            arguments: "{}".into(),
        });
        assert!(!msg.is_final_answer());
    }
}
