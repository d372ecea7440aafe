//! PostgreSQL-backed user repository.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tally_application::UserRepository;
use tally_core::{AppError, AppResult};
use tally_domain::{EmailAddress, RoleName, User, UserId};

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role_name: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self::new(
            UserId::new(row.id)?,
            EmailAddress::new(row.email)?,
            row.first_name,
            row.last_name,
            row.role_name.map(RoleName::new).transpose()?,
        ))
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user(&self, user_id: &UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT users.id, users.email, users.first_name, users.last_name, roles.role_name
            FROM users
            LEFT JOIN roles ON roles.id = users.role_id
            WHERE users.id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!("failed to find user '{user_id}': {error}"))
        })?;

        row.map(User::try_from).transpose()
    }

    async fn find_users_by_role(&self, role: &RoleName) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT users.id, users.email, users.first_name, users.last_name, roles.role_name
            FROM users
            INNER JOIN roles ON roles.id = users.role_id
            WHERE roles.role_name = $1
            ORDER BY users.id
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!("failed to list users holding role '{role}': {error}"))
        })?;

        rows.into_iter().map(User::try_from).collect()
    }
}
