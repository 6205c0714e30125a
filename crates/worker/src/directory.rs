//! Built-in user directory seeded from `[[users]]` in the config file.

use async_trait::async_trait;
use merlin_config::UserConfig;
use merlin_core::error::DirectoryError;
use merlin_core::user::{User, UserDirectory};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn from_config(users: &[UserConfig]) -> Self {
        Self::new(users.iter().cloned().map(User::from).collect())
    }

    /// Add a user, replacing any entry with the same internal id.
    pub async fn insert(&self, user: User) {
        let mut users = self.users.write().await;
        users.retain(|u| u.id != user.id);
        users.push(user);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn lookup_by_external_id(&self, external_id: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }
}
