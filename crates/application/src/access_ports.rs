use async_trait::async_trait;
use tally_core::AppResult;
use tally_domain::{ResourceName, Role, RoleName, RolePermission, User, UserId};

/// Role returned to callers together with its grants and approvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Role record.
    pub role: Role,
    /// Per-resource grants, one per resource.
    pub permissions: Vec<RolePermission>,
    /// Roles allowed to approve what this role proposes.
    pub checker_roles: Vec<Role>,
}

/// Repository port for roles, grants, and approval-chain edges.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &RoleName) -> AppResult<Option<Role>>;

    /// Lists roles reachable through one outgoing approval-chain edge.
    async fn find_checker_roles(&self, maker_role: &RoleName) -> AppResult<Vec<Role>>;

    /// Finds the grant row for one `(role, resource)` pair.
    async fn find_role_permission(
        &self,
        role: &RoleName,
        resource: &ResourceName,
    ) -> AppResult<Option<RolePermission>>;

    /// Lists all grant rows of a role.
    async fn list_role_permissions(&self, role: &RoleName) -> AppResult<Vec<RolePermission>>;
}

/// Repository port for user lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by identifier.
    async fn find_user(&self, user_id: &UserId) -> AppResult<Option<User>>;

    /// Lists users currently assigned a role.
    async fn find_users_by_role(&self, role: &RoleName) -> AppResult<Vec<User>>;
}
