//! PostgreSQL-backed role, grant, and approval-chain lookups.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tally_application::RoleRepository;
use tally_core::{AppError, AppResult};
use tally_domain::{ResourceName, Role, RoleId, RoleName, RolePermission};
use uuid::Uuid;

/// PostgreSQL implementation of the role repository port.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    role_name: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = AppError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoleId::from_uuid(row.id),
            name: RoleName::new(row.role_name)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    resource: String,
    can_create: bool,
    can_read: bool,
    can_update: bool,
    can_delete: bool,
}

impl TryFrom<RolePermissionRow> for RolePermission {
    type Error = AppError;

    fn try_from(row: RolePermissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role_id: RoleId::from_uuid(row.role_id),
            resource: ResourceName::new(row.resource)?,
            can_create: row.can_create,
            can_read: row.can_read,
            can_update: row.can_update,
            can_delete: row.can_delete,
        })
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_role_by_name(&self, name: &RoleName) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, role_name
            FROM roles
            WHERE role_name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::DataAccess(format!("failed to find role '{name}': {error}")))?;

        row.map(Role::try_from).transpose()
    }

    async fn find_checker_roles(&self, maker_role: &RoleName) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT checker.id, checker.role_name
            FROM approval_chain_maps chain
            INNER JOIN roles maker ON maker.id = chain.maker_role_id
            INNER JOIN roles checker ON checker.id = chain.checker_role_id
            WHERE maker.role_name = $1
            ORDER BY checker.role_name
            "#,
        )
        .bind(maker_role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to list checker roles for maker role '{maker_role}': {error}"
            ))
        })?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn find_role_permission(
        &self,
        role: &RoleName,
        resource: &ResourceName,
    ) -> AppResult<Option<RolePermission>> {
        let row = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                grants.role_id,
                grants.resource,
                grants.can_create,
                grants.can_read,
                grants.can_update,
                grants.can_delete
            FROM role_permissions grants
            INNER JOIN roles ON roles.id = grants.role_id
            WHERE roles.role_name = $1 AND grants.resource = $2
            "#,
        )
        .bind(role.as_str())
        .bind(resource.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to find permission of role '{role}' on '{resource}': {error}"
            ))
        })?;

        row.map(RolePermission::try_from).transpose()
    }

    async fn list_role_permissions(&self, role: &RoleName) -> AppResult<Vec<RolePermission>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                grants.role_id,
                grants.resource,
                grants.can_create,
                grants.can_read,
                grants.can_update,
                grants.can_delete
            FROM role_permissions grants
            INNER JOIN roles ON roles.id = grants.role_id
            WHERE roles.role_name = $1
            ORDER BY grants.resource
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to list permissions of role '{role}': {error}"
            ))
        })?;

        rows.into_iter().map(RolePermission::try_from).collect()
    }
}
