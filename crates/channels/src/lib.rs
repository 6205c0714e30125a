//! Outbound chat delivery.
//!
//! - **Telegram**: Bot API client implementing [`ChatPlatform`](merlin_core::channel::ChatPlatform)
//! - **ReplyDispatcher**: ordered, paced sending on top of any platform

pub mod dispatcher;
pub mod telegram;

pub use dispatcher::{ACTION_PROMPT, ReplyDispatcher, split_message};
pub use telegram::TelegramPlatform;
