//! PostgreSQL bulk loader used by the seed binary.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tally_application::SeedRepository;
use tally_core::{AppError, AppResult};
use tally_domain::{ApprovalChainEdge, PointsAccount, Role, RolePermission, User};
use uuid::Uuid;

/// Tables in delete order, children first.
const CLEAR_ORDER: &[&str] = &[
    "transactions",
    "points",
    "users",
    "approval_chain_maps",
    "role_permissions",
    "roles",
];

/// PostgreSQL implementation of the seed repository port.
#[derive(Clone)]
pub struct PostgresSeedRepository {
    pool: PgPool,
}

impl PostgresSeedRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn role_ids(&self) -> AppResult<HashMap<String, Uuid>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, role_name FROM roles")
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::DataAccess(format!("failed to list role ids: {error}")))?;

        Ok(rows.into_iter().map(|(id, name)| (name, id)).collect())
    }
}

#[async_trait]
impl SeedRepository for PostgresSeedRepository {
    async fn clear_all(&self) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::DataAccess(format!("failed to start clear transaction: {error}"))
        })?;

        for table in CLEAR_ORDER {
            let statement = format!("DELETE FROM {table}");
            sqlx::query(statement.as_str())
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::DataAccess(format!("failed to clear table '{table}': {error}"))
                })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::DataAccess(format!("failed to commit clear transaction: {error}"))
        })?;

        Ok(())
    }

    async fn insert_role(&self, role: &Role, permissions: &[RolePermission]) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::DataAccess(format!(
                "failed to start insert transaction for role '{}': {error}",
                role.name
            ))
        })?;

        sqlx::query("INSERT INTO roles (id, role_name) VALUES ($1, $2)")
            .bind(role.id.as_uuid())
            .bind(role.name.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::DataAccess(format!("failed to insert role '{}': {error}", role.name))
            })?;

        if !permissions.is_empty() {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO role_permissions \
                 (role_id, resource, can_create, can_read, can_update, can_delete) ",
            );
            builder.push_values(permissions, |mut row, permission| {
                row.push_bind(role.id.as_uuid())
                    .push_bind(permission.resource.as_str())
                    .push_bind(permission.can_create)
                    .push_bind(permission.can_read)
                    .push_bind(permission.can_update)
                    .push_bind(permission.can_delete);
            });

            builder
                .build()
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::DataAccess(format!(
                        "failed to insert permissions of role '{}': {error}",
                        role.name
                    ))
                })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::DataAccess(format!(
                "failed to commit insert transaction for role '{}': {error}",
                role.name
            ))
        })?;

        Ok(())
    }

    async fn insert_approval_edge(&self, edge: &ApprovalChainEdge) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO approval_chain_maps (maker_role_id, checker_role_id)
            SELECT maker.id, checker.id
            FROM roles maker, roles checker
            WHERE maker.role_name = $1 AND checker.role_name = $2
            "#,
        )
        .bind(edge.maker_role().as_str())
        .bind(edge.checker_role().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to insert approval chain edge '{}' -> '{}': {error}",
                edge.maker_role(),
                edge.checker_role()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "approval chain edge '{}' -> '{}' references a missing role",
                edge.maker_role(),
                edge.checker_role()
            )));
        }

        Ok(())
    }

    async fn insert_users(&self, users: &[User]) -> AppResult<u64> {
        if users.is_empty() {
            return Ok(0);
        }

        let role_ids = self.role_ids().await?;
        let mut rows = Vec::with_capacity(users.len());
        for user in users {
            let role_id = match user.role() {
                Some(role) => Some(*role_ids.get(role.as_str()).ok_or_else(|| {
                    AppError::Validation(format!(
                        "user '{}' references unknown role '{role}'",
                        user.id()
                    ))
                })?),
                None => None,
            };
            rows.push((user, role_id));
        }

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO users (id, email, first_name, last_name, role_id) ");
        builder.push_values(rows, |mut row, (user, role_id)| {
            row.push_bind(user.id().as_str())
                .push_bind(user.email().as_str())
                .push_bind(user.first_name())
                .push_bind(user.last_name())
                .push_bind(role_id);
        });

        let result = builder.build().execute(&self.pool).await.map_err(|error| {
            AppError::DataAccess(format!(
                "failed to insert batch of {} users: {error}",
                users.len()
            ))
        })?;

        Ok(result.rows_affected())
    }

    async fn insert_points_accounts(&self, accounts: &[PointsAccount]) -> AppResult<u64> {
        if accounts.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO points (id, user_id, balance) ");
        builder.push_values(accounts, |mut row, account| {
            row.push_bind(account.id().as_str())
                .push_bind(account.user_id().as_str())
                .push_bind(account.balance());
        });

        let result = builder.build().execute(&self.pool).await.map_err(|error| {
            AppError::DataAccess(format!(
                "failed to insert batch of {} points accounts: {error}",
                accounts.len()
            ))
        })?;

        Ok(result.rows_affected())
    }
}
