//! JobDecoder: queue payload to validated [`Job`].
//!
//! The queue delivers base64-encoded JSON; raw JSON is accepted too. The
//! only accepted shape embeds the user:
//!
//! ```json
//! {"chatId": "c1", "message": "hi", "threadId": "t1",
//!  "user": {"id": "u1", "externalId": "100", "firstName": "Ada", "lastName": "L"}}
//! ```
//!
//! Unknown fields are rejected at every level.

use base64::Engine;
use merlin_core::error::ValidationError;
use serde::{Deserialize, Serialize};

/// One inbound chat message, validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub chat_id: String,
    pub message: String,
    pub thread_id: String,
    pub user: UserRef,
}

/// The user as the job describes them, before directory resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct JobPayload {
    chat_id: Option<String>,
    message: Option<String>,
    thread_id: Option<String>,
    user: Option<UserPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UserPayload {
    id: Option<String>,
    external_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

pub struct JobDecoder;

impl JobDecoder {
    /// Decode and validate one queue payload.
    pub fn decode(payload: impl AsRef<[u8]>) -> Result<Job, ValidationError> {
        let bytes = Self::unwrap_encoding(payload.as_ref())?;
        let raw: JobPayload = serde_json::from_slice(&bytes).map_err(|e| {
            if e.is_syntax() || e.is_eof() {
                ValidationError::Malformed(e.to_string())
            } else {
                ValidationError::Schema(e.to_string())
            }
        })?;

        let user = raw.user.ok_or(ValidationError::MissingField("user"))?;
        Ok(Job {
            chat_id: required(raw.chat_id, "chatId")?,
            message: required(raw.message, "message")?,
            thread_id: required(raw.thread_id, "threadId")?,
            user: UserRef {
                id: required(user.id, "user.id")?,
                external_id: optional(user.external_id),
                first_name: optional(user.first_name),
                last_name: optional(user.last_name),
            },
        })
    }

    fn unwrap_encoding(payload: &[u8]) -> Result<Vec<u8>, ValidationError> {
        let trimmed = payload.trim_ascii();
        if trimmed.first() == Some(&b'{') {
            return Ok(trimmed.to_vec());
        }
        base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| ValidationError::Malformed(format!("neither JSON nor base64: {e}")))
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
