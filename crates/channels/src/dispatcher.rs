//! ReplyDispatcher: ordered, paced delivery of replies.
//!
//! Messages to one chat go out strictly one after another with a random
//! pause between consecutive sends, so a multi-part reply reads like typing
//! rather than a burst.

use merlin_config::DispatchConfig;
use merlin_core::channel::{ChatPlatform, LinkButton, OutboundMessage, Photo};
use merlin_core::error::ChannelError;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Prompt sent after a photo group when actions are attached.
pub const ACTION_PROMPT: &str = "Choose an action:";

pub struct ReplyDispatcher {
    platform: Arc<dyn ChatPlatform>,
    min_delay: Duration,
    max_delay: Duration,
    message_limit: usize,
}

impl ReplyDispatcher {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            platform,
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            message_limit: 4096,
        }
    }

    pub fn from_config(platform: Arc<dyn ChatPlatform>, config: &DispatchConfig) -> Self {
        Self::new(platform)
            .with_pacing(
                Duration::from_millis(config.min_delay_ms),
                Duration::from_millis(config.max_delay_ms),
            )
            .with_message_limit(config.message_limit)
    }

    /// Bounds for the pause between consecutive sends. Swapped if reversed.
    pub fn with_pacing(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min.min(max);
        self.max_delay = max.max(min);
        self
    }

    pub fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = limit.max(1);
        self
    }

    fn pause(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Send messages in order, pausing between each consecutive pair.
    /// Stops at the first failure; earlier messages stay delivered.
    pub async fn send_messages(
        &self,
        chat_id: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), ChannelError> {
        for (i, message) in messages.iter().enumerate() {
            if i > 0 {
                let pause = self.pause();
                debug!(chat_id, pause_ms = pause.as_millis() as u64, "Pacing reply");
                tokio::time::sleep(pause).await;
            }
            self.platform.send_message(chat_id, message).await?;
        }
        info!(chat_id, count = messages.len(), platform = self.platform.name(), "Replies sent");
        Ok(())
    }

    /// Send one reply, split into several messages if it exceeds the
    /// platform limit. Returns how many messages were sent.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<usize, ChannelError> {
        let messages: Vec<OutboundMessage> = split_message(text, self.message_limit)
            .into_iter()
            .map(OutboundMessage::text)
            .collect();
        self.send_messages(chat_id, &messages).await?;
        Ok(messages.len())
    }

    /// Send a photo group, then an action prompt if actions are given.
    pub async fn send_photos(
        &self,
        chat_id: &str,
        photos: &[Photo],
        actions: Vec<Vec<LinkButton>>,
    ) -> Result<(), ChannelError> {
        self.platform.send_media_group(chat_id, photos).await?;
        if actions.is_empty() {
            return Ok(());
        }
        tokio::time::sleep(self.pause()).await;
        self.send_messages(chat_id, &[OutboundMessage::text(ACTION_PROMPT).with_actions(actions)])
            .await
    }
}

/// Split `text` into chunks of at most `limit` characters, preferring
/// paragraph breaks, then line breaks, then spaces.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while rest.chars().count() > limit {
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..window_end];

        let cut = window
            .rfind("\n\n")
            .or_else(|| window.rfind('\n'))
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(window_end);

        let chunk = rest[..cut].trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
