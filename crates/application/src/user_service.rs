use std::sync::Arc;

use tally_core::{AppError, AppResult, RequestContext};
use tally_domain::{User, UserId};
use tracing::debug;

use crate::access_ports::UserRepository;

/// Read-only user lookups.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    /// Creates a user service.
    #[must_use]
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Returns one user by identifier.
    pub async fn get_user(&self, context: &RequestContext, user_id: &str) -> AppResult<User> {
        let user_id = UserId::new(user_id)?;
        debug!(caller_id = context.caller_label(), user_id = %user_id, "user lookup");

        self.repository
            .find_user(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use tally_core::{AppError, RequestContext};

    use super::UserService;
    use crate::test_support::FakeStore;

    #[tokio::test]
    async fn returns_known_users_with_their_role() {
        let service = UserService::new(FakeStore::seeded().await);

        let user = service
            .get_user(&RequestContext::anonymous(), " pm-1 ")
            .await;
        assert!(user.is_ok());
        let user = user.unwrap_or_else(|_| unreachable!());
        assert_eq!(user.email().as_str(), "pm-1@tally.test");
        assert_eq!(user.role().map(|role| role.as_str()), Some("product_manager"));
    }

    #[tokio::test]
    async fn unknown_and_blank_ids_fail() {
        let service = UserService::new(FakeStore::seeded().await);
        let context = RequestContext::anonymous();

        assert!(matches!(
            service.get_user(&context, "nobody").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_user(&context, "  ").await,
            Err(AppError::Validation(_))
        ));
    }
}
