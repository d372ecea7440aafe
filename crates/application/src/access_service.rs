use std::sync::Arc;

use tally_core::{AppError, AppResult, RequestContext};
use tally_domain::{CrudAction, ResourceName, Role, RoleName};
use tracing::{debug, warn};

use crate::access_ports::{RoleDefinition, RoleRepository};

/// Application service for role grants and approval-chain lookups.
///
/// Every permission check and checker-role derivation in the workspace goes
/// through this service.
#[derive(Clone)]
pub struct AccessService {
    repository: Arc<dyn RoleRepository>,
}

impl AccessService {
    /// Creates a new access service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleRepository>) -> Self {
        Self { repository }
    }

    /// Returns whether the role holds the action on the resource.
    ///
    /// Fails closed: a missing role or a missing grant row is a denial.
    pub async fn has_permission(
        &self,
        context: &RequestContext,
        role: &RoleName,
        resource: &ResourceName,
        action: CrudAction,
    ) -> AppResult<bool> {
        let granted = self
            .repository
            .find_role_permission(role, resource)
            .await?
            .is_some_and(|permission| permission.allows(action));

        debug!(
            caller_id = context.caller_label(),
            role = %role,
            resource = %resource,
            action = action.as_str(),
            granted,
            "permission check"
        );

        Ok(granted)
    }

    /// Ensures the role holds the action on the resource.
    pub async fn require_permission(
        &self,
        context: &RequestContext,
        role: &RoleName,
        resource: &ResourceName,
        action: CrudAction,
    ) -> AppResult<()> {
        if self.has_permission(context, role, resource, action).await? {
            return Ok(());
        }

        Err(AppError::Unauthorized(format!(
            "role '{role}' is missing '{}' on '{resource}'",
            action.as_str()
        )))
    }

    /// Returns the roles allowed to approve what `maker_role` proposes.
    ///
    /// The maker role itself is never part of the result. An empty result is a
    /// configuration gap and is logged as such.
    pub async fn checker_roles_for(
        &self,
        context: &RequestContext,
        maker_role: &RoleName,
    ) -> AppResult<Vec<Role>> {
        let mut roles = self.repository.find_checker_roles(maker_role).await?;

        let edge_count = roles.len();
        roles.retain(|role| &role.name != maker_role);
        if roles.len() != edge_count {
            warn!(
                caller_id = context.caller_label(),
                maker_role = %maker_role,
                "ignoring approval-chain self-loop"
            );
        }

        roles.sort_by(|left, right| left.name.cmp(&right.name));
        roles.dedup_by(|left, right| left.id == right.id);

        if roles.is_empty() {
            warn!(
                caller_id = context.caller_label(),
                maker_role = %maker_role,
                "no approval chain configured for maker role"
            );
        }

        Ok(roles)
    }

    /// Returns a role with its grants and checker roles.
    pub async fn get_role(&self, context: &RequestContext, role_name: &str) -> AppResult<RoleDefinition> {
        let name = RoleName::new(role_name)?;
        let role = self
            .repository
            .find_role_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{name}' does not exist")))?;

        let mut permissions = self.repository.list_role_permissions(&name).await?;
        permissions.sort_by(|left, right| left.resource.cmp(&right.resource));
        let checker_roles = self.checker_roles_for(context, &name).await?;

        Ok(RoleDefinition {
            role,
            permissions,
            checker_roles,
        })
    }
}
