//! IdentityResolver: job user reference to a registered [`User`].

use crate::job::UserRef;
use merlin_core::user::{User, UserDirectory};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves by internal id first, then by external id. When the job carries
/// no external id, its `id` is tried as one, since chat platforms often
/// only know their own id.
///
/// Absence is a normal outcome. A directory outage is logged and treated as
/// absence for that lookup.
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, user: &UserRef) -> Option<User> {
        match self.directory.lookup_by_id(&user.id).await {
            Ok(Some(found)) => return Some(found),
            Ok(None) => {}
            Err(e) => warn!(user_id = %user.id, error = %e, "Lookup by id failed"),
        }

        let external_id = user.external_id.as_deref().unwrap_or(&user.id);
        match self.directory.lookup_by_external_id(external_id).await {
            Ok(found) => {
                if found.is_none() {
                    debug!(user_id = %user.id, external_id, "User not registered");
                }
                found
            }
            Err(e) => {
                warn!(external_id, error = %e, "Lookup by external id failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use async_trait::async_trait;
    use merlin_core::error::DirectoryError;

    fn ada() -> User {
        User {
            id: "u1".into(),
            external_id: "100".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    fn reference(id: &str, external_id: Option<&str>) -> UserRef {
        UserRef {
            id: id.into(),
            external_id: external_id.map(Into::into),
            first_name: None,
            last_name: None,
        }
    }

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(Arc::new(InMemoryUserDirectory::new(vec![ada()])))
    }

    #[tokio::test]
    async fn resolves_by_internal_id() {
        assert_eq!(resolver().resolve(&reference("u1", None)).await, Some(ada()));
    }

    #[tokio::test]
    async fn falls_back_to_external_id() {
        assert_eq!(resolver().resolve(&reference("zz", Some("100"))).await, Some(ada()));
    }

    #[tokio::test]
    async fn id_is_tried_as_external_id() {
        assert_eq!(resolver().resolve(&reference("100", None)).await, Some(ada()));
    }

    #[tokio::test]
    async fn unknown_user_is_absent() {
        assert_eq!(resolver().resolve(&reference("nobody", Some("999"))).await, None);
    }

    struct DownDirectory;

    #[async_trait]
    impl UserDirectory for DownDirectory {
        async fn lookup_by_id(&self, _id: &str) -> Result<Option<User>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }

        async fn lookup_by_external_id(&self, _id: &str) -> Result<Option<User>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn directory_outage_is_absence() {
        let resolver = IdentityResolver::new(Arc::new(DownDirectory));
        assert_eq!(resolver.resolve(&reference("u1", Some("100"))).await, None);
    }
}
