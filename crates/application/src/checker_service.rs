use std::collections::BTreeMap;
use std::sync::Arc;

use tally_core::{AppError, AppResult, RequestContext};
use tally_domain::{RoleName, User, UserContact, UserId};
use tracing::{debug, warn};

use crate::AccessService;
use crate::access_ports::UserRepository;

/// Outcome of resolving who may approve a maker role's transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerResolution {
    /// At least one checker role exists. The contact list may still be empty
    /// when nobody currently holds those roles.
    Eligible(Vec<UserContact>),
    /// The maker role has no approval chain configured.
    NoEligibleCheckers,
}

impl CheckerResolution {
    /// Returns the resolved contacts, empty when no chain exists.
    #[must_use]
    pub fn contacts(&self) -> &[UserContact] {
        match self {
            Self::Eligible(contacts) => contacts,
            Self::NoEligibleCheckers => &[],
        }
    }

    /// Returns the delivery addresses of the resolved contacts.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.contacts()
            .iter()
            .map(|contact| contact.email.as_str().to_owned())
            .collect()
    }
}

/// Application service mapping maker roles to the users allowed to check them.
#[derive(Clone)]
pub struct CheckerService {
    access_service: AccessService,
    user_repository: Arc<dyn UserRepository>,
}

impl CheckerService {
    /// Creates a checker service.
    #[must_use]
    pub fn new(access_service: AccessService, user_repository: Arc<dyn UserRepository>) -> Self {
        Self {
            access_service,
            user_repository,
        }
    }

    /// Resolves the contacts of every user holding a checker role of
    /// `maker_role`, once per user, ordered by user id.
    pub async fn resolve_checkers(
        &self,
        context: &RequestContext,
        maker_role: &RoleName,
    ) -> AppResult<CheckerResolution> {
        let checker_roles = self
            .access_service
            .checker_roles_for(context, maker_role)
            .await?;
        if checker_roles.is_empty() {
            return Ok(CheckerResolution::NoEligibleCheckers);
        }

        let mut contacts = BTreeMap::new();
        for role in &checker_roles {
            for user in self.user_repository.find_users_by_role(&role.name).await? {
                contacts
                    .entry(user.id().clone())
                    .or_insert_with(|| user.contact());
            }
        }

        debug!(
            caller_id = context.caller_label(),
            maker_role = %maker_role,
            checker_roles = checker_roles.len(),
            checkers = contacts.len(),
            "resolved checkers"
        );

        Ok(CheckerResolution::Eligible(contacts.into_values().collect()))
    }

    /// Resolves the checkers who may decide what `maker_id` proposes.
    ///
    /// The maker is never part of the result. When `role` is given it must be
    /// the maker's assigned role.
    pub async fn get_checkers(
        &self,
        context: &RequestContext,
        maker_id: &UserId,
        role: Option<&RoleName>,
    ) -> AppResult<CheckerResolution> {
        let maker = self.find_maker(maker_id).await?;
        let maker_role = maker_role(&maker)?;

        if let Some(requested) = role
            && requested != maker_role
        {
            return Err(AppError::Validation(format!(
                "user '{maker_id}' holds role '{maker_role}', not '{requested}'"
            )));
        }

        let resolution = match self.resolve_checkers(context, maker_role).await? {
            CheckerResolution::Eligible(mut contacts) => {
                contacts.retain(|contact| &contact.user_id != maker_id);
                CheckerResolution::Eligible(contacts)
            }
            CheckerResolution::NoEligibleCheckers => {
                warn!(
                    caller_id = context.caller_label(),
                    maker_id = %maker_id,
                    maker_role = %maker_role,
                    "maker role has no eligible checkers"
                );
                CheckerResolution::NoEligibleCheckers
            }
        };

        Ok(resolution)
    }

    async fn find_maker(&self, maker_id: &UserId) -> AppResult<User> {
        self.user_repository
            .find_user(maker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{maker_id}' does not exist")))
    }
}

/// Returns the maker's role or a validation error for role-less users.
pub(crate) fn maker_role(maker: &User) -> AppResult<&RoleName> {
    maker.role().ok_or_else(|| {
        AppError::Validation(format!(
            "user '{}' holds no role and cannot propose transactions",
            maker.id()
        ))
    })
}

#[cfg(test)]
mod tests;
