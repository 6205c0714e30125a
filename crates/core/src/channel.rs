//! ChatPlatform trait: the abstraction over the outbound chat API.
//!
//! Only delivery lives here. Inbound events reach the pipeline through the
//! job queue, never through this trait.

use crate::error::ChannelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A labeled link action rendered under a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

impl LinkButton {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// One outbound text message with optional rows of link actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,

    /// Ordered rows; each row is rendered left to right.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Vec<LinkButton>>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<Vec<LinkButton>>) -> Self {
        self.actions = actions;
        self
    }
}

/// A photo in a grouped-media message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// The chat platform the assistant replies through.
///
/// Implementations wrap transport failures with endpoint context and do not
/// retry.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Human-readable platform name (e.g., "telegram").
    fn name(&self) -> &str;

    /// Send one text message.
    async fn send_message(&self, chat_id: &str, message: &OutboundMessage) -> Result<(), ChannelError>;

    /// Send one grouped-media message.
    async fn send_media_group(&self, chat_id: &str, photos: &[Photo]) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_message_without_actions_omits_field() {
        let msg = OutboundMessage::text("Hello!");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["text"], "Hello!");
        assert!(json.get("actions").is_none());
    }

    #[test]
    fn outbound_message_keeps_row_order() {
        let msg = OutboundMessage::text("Pick one").with_actions(vec![
            vec![LinkButton::new("A", "https://a.test")],
            vec![
                LinkButton::new("B", "https://b.test"),
                LinkButton::new("C", "https://c.test"),
            ],
        ]);
        assert_eq!(msg.actions[0][0].text, "A");
        assert_eq!(msg.actions[1][1].url, "https://c.test");
    }
}
