//! Telegram Bot API client.
//!
//! Outbound only: `sendMessage` and `sendMediaGroup`. Text is sent with
//! `parse_mode=HTML` and link previews disabled; link actions become an
//! inline keyboard of url buttons. Reply text is plain text, so `&`, `<` and
//! `>` are escaped before Telegram parses it.

use async_trait::async_trait;
use merlin_config::TelegramConfig;
use merlin_core::channel::{ChatPlatform, OutboundMessage, Photo};
use merlin_core::error::ChannelError;
use serde_json::{Value, json};
use tracing::{debug, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";

pub struct TelegramPlatform {
    base_url: String,
    bot_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TelegramPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramPlatform")
            .field("base_url", &self.base_url)
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

impl TelegramPlatform {
    pub fn new(bot_token: impl Into<String>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: TELEGRAM_API.to_string(),
            bot_token: bot_token.into(),
            client,
        })
    }

    /// Point at a different Bot API server (self-hosted or a test double).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self, ChannelError> {
        match config.bot_token.as_deref() {
            Some(token) if !token.is_empty() => Self::new(token),
            _ => Err(ChannelError::NotConfigured(
                "telegram.bot_token is not set".into(),
            )),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.bot_token)
    }

    /// The endpoint as it may appear in logs and errors.
    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot<redacted>/{method}", self.base_url)
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<(), ChannelError> {
        let endpoint = self.endpoint(method);
        debug!(%endpoint, "Telegram request");

        let response = self
            .client
            .post(self.url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                endpoint: endpoint.clone(),
                reason: redact(&e.to_string(), &self.bot_token),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %endpoint, "Telegram rejected request");
            return Err(ChannelError::Rejected {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, "<redacted>")
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn message_payload(chat_id: &str, message: &OutboundMessage) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": escape_html(&message.text),
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
    });
    if !message.actions.is_empty() {
        payload["reply_markup"] = json!({ "inline_keyboard": message.actions });
    }
    payload
}

pub(crate) fn media_group_payload(chat_id: &str, photos: &[Photo]) -> Value {
    let media: Vec<Value> = photos
        .iter()
        .map(|photo| {
            let mut item = json!({ "type": "photo", "media": photo.url });
            if let Some(caption) = &photo.caption {
                item["caption"] = json!(caption);
            }
            item
        })
        .collect();
    json!({ "chat_id": chat_id, "media": media })
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, chat_id: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        self.call("sendMessage", &message_payload(chat_id, message)).await
    }

    async fn send_media_group(&self, chat_id: &str, photos: &[Photo]) -> Result<(), ChannelError> {
        self.call("sendMediaGroup", &media_group_payload(chat_id, photos)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merlin_core::channel::LinkButton;

    #[test]
    fn plain_message_payload() {
        let payload = message_payload("42", &OutboundMessage::text("hi"));
        assert_eq!(payload["chat_id"], "42");
        assert_eq!(payload["text"], "hi");
        assert_eq!(payload["parse_mode"], "HTML");
        assert_eq!(payload["disable_web_page_preview"], true);
        assert!(payload.get("reply_markup").is_none());
    }

    #[test]
    fn markup_characters_are_escaped() {
        let message = OutboundMessage::text("If x < 5 & y > 2 then ok\n\nTools Used: none");
        let payload = message_payload("c1", &message);
        assert_eq!(payload["parse_mode"], "HTML");
        assert_eq!(
            payload["text"],
            "If x &lt; 5 &amp; y &gt; 2 then ok\n\nTools Used: none"
        );

        let payload = message_payload("c1", &OutboundMessage::text("<b>Tom & Jerry</b>"));
        assert_eq!(payload["text"], "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }

    #[test]
    fn actions_become_inline_keyboard() {
        let message = OutboundMessage::text("pick").with_actions(vec![
            vec![LinkButton::new("Docs", "https://example.com/docs")],
            vec![
                LinkButton::new("A", "https://example.com/a"),
                LinkButton::new("B", "https://example.com/b"),
            ],
        ]);
        let payload = message_payload("42", &message);
        let keyboard = &payload["reply_markup"]["inline_keyboard"];
        assert_eq!(keyboard.as_array().unwrap().len(), 2);
        assert_eq!(keyboard[0][0]["text"], "Docs");
        assert_eq!(keyboard[1][1]["url"], "https://example.com/b");
    }

    #[test]
    fn media_group_items_are_photos() {
        let photos = vec![
            Photo {
                url: "https://example.com/1.jpg".into(),
                caption: Some("first".into()),
            },
            Photo {
                url: "https://example.com/2.jpg".into(),
                caption: None,
            },
        ];
        let payload = media_group_payload("42", &photos);
        assert_eq!(payload["media"][0]["type"], "photo");
        assert_eq!(payload["media"][0]["caption"], "first");
        assert!(payload["media"][1].get("caption").is_none());
    }

    #[test]
    fn endpoint_never_contains_token() {
        let platform = TelegramPlatform::new("123:SECRET").unwrap();
        assert_eq!(
            platform.endpoint("sendMessage"),
            "https://api.telegram.org/bot<redacted>/sendMessage"
        );
        assert!(platform.url("sendMessage").contains("123:SECRET"));
        assert!(!format!("{platform:?}").contains("SECRET"));
    }

    #[test]
    fn from_config_requires_token() {
        let err = TelegramPlatform::from_config(&TelegramConfig::default()).unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));

        let config = TelegramConfig {
            bot_token: Some("123:abc".into()),
        };
        assert!(TelegramPlatform::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn transport_failure_names_redacted_endpoint() {
        let platform = TelegramPlatform::new("123:SECRET")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err = platform
            .send_message("42", &OutboundMessage::text("hi"))
            .await
            .unwrap_err();
        match err {
            ChannelError::DeliveryFailed { endpoint, reason } => {
                assert_eq!(endpoint, "http://127.0.0.1:9/bot<redacted>/sendMessage");
                assert!(!reason.contains("SECRET"));
            }
            other => panic!("expected DeliveryFailed, got {other:?}"),
        }
    }
}
