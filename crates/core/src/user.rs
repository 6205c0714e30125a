//! Internal users and the directory that stores them.

use crate::error::DirectoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A registered user of the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal id
    pub id: String,

    /// Chat-platform id (e.g. the Telegram user id)
    pub external_id: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,
}

/// Lookup side of the user store. Account CRUD lives elsewhere.
///
/// `Ok(None)` means "no such user"; `Err` is reserved for the directory
/// itself being unreachable.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError>;

    async fn lookup_by_external_id(&self, external_id: &str) -> Result<Option<User>, DirectoryError>;
}
