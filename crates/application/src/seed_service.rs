//! Bulk loading of the role catalog, users, and points accounts.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tally_core::{AppError, AppResult, RequestContext};
use tally_domain::{ApprovalChainEdge, PointsAccount, Role, RolePermission, User};
use tracing::info;

use crate::RoleCatalog;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Repository port for destructive bulk loads.
#[async_trait]
pub trait SeedRepository: Send + Sync {
    /// Deletes every row, children before parents.
    async fn clear_all(&self) -> AppResult<()>;

    /// Inserts one role and its grant rows.
    async fn insert_role(&self, role: &Role, permissions: &[RolePermission]) -> AppResult<()>;

    /// Inserts one approval-chain edge between two existing roles.
    async fn insert_approval_edge(&self, edge: &ApprovalChainEdge) -> AppResult<()>;

    /// Inserts one batch of users. Role references are resolved by name.
    async fn insert_users(&self, users: &[User]) -> AppResult<u64>;

    /// Inserts one batch of points accounts.
    async fn insert_points_accounts(&self, accounts: &[PointsAccount]) -> AppResult<u64>;
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Row counts written by one seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Roles inserted.
    pub roles: usize,
    /// Grant rows inserted.
    pub permissions: usize,
    /// Approval-chain edges inserted.
    pub approval_edges: usize,
    /// Users inserted.
    pub users: u64,
    /// Points accounts inserted.
    pub points_accounts: u64,
}

/// Replaces the store contents with a catalog and a user population.
#[derive(Clone)]
pub struct SeedService {
    repository: Arc<dyn SeedRepository>,
    batch_size: usize,
}

impl SeedService {
    /// Creates a seed service writing users and accounts in `batch_size` chunks.
    pub fn new(repository: Arc<dyn SeedRepository>, batch_size: usize) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Validation(
                "seed batch size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            repository,
            batch_size,
        })
    }

    /// Validates the input, clears the store, then loads everything.
    ///
    /// Nothing is deleted when validation fails.
    pub async fn seed(
        &self,
        context: &RequestContext,
        catalog: &RoleCatalog,
        users: &[User],
        accounts: &[PointsAccount],
    ) -> AppResult<SeedReport> {
        validate_population(catalog, users, accounts)?;

        self.repository.clear_all().await?;
        info!(caller_id = context.caller_label(), "cleared existing data");

        let mut report = SeedReport::default();
        for seed in catalog.roles() {
            let role = Role::new(seed.name.clone());
            let permissions: Vec<RolePermission> = seed
                .permissions
                .iter()
                .map(|grant| RolePermission::granting(role.id, grant.resource.clone(), &grant.actions))
                .collect();

            self.repository.insert_role(&role, &permissions).await?;
            report.roles += 1;
            report.permissions += permissions.len();
        }

        for edge in catalog.edges() {
            self.repository.insert_approval_edge(edge).await?;
            report.approval_edges += 1;
        }
        info!(
            roles = report.roles,
            permissions = report.permissions,
            approval_edges = report.approval_edges,
            "seeded role catalog"
        );

        for (index, batch) in users.chunks(self.batch_size).enumerate() {
            report.users += self.repository.insert_users(batch).await?;
            info!(batch = index + 1, rows = batch.len(), "seeded user batch");
        }

        for (index, batch) in accounts.chunks(self.batch_size).enumerate() {
            report.points_accounts += self.repository.insert_points_accounts(batch).await?;
            info!(batch = index + 1, rows = batch.len(), "seeded points batch");
        }

        info!(
            users = report.users,
            points_accounts = report.points_accounts,
            "seed complete"
        );

        Ok(report)
    }
}

fn validate_population(
    catalog: &RoleCatalog,
    users: &[User],
    accounts: &[PointsAccount],
) -> AppResult<()> {
    let mut user_ids = HashSet::new();
    for user in users {
        if !user_ids.insert(user.id()) {
            return Err(AppError::Validation(format!(
                "user '{}' appears more than once",
                user.id()
            )));
        }

        if let Some(role) = user.role()
            && !catalog.contains_role(role)
        {
            return Err(AppError::Validation(format!(
                "user '{}' references unknown role '{role}'",
                user.id()
            )));
        }
    }

    let mut account_ids = HashSet::new();
    for account in accounts {
        if !account_ids.insert(account.id()) {
            return Err(AppError::Validation(format!(
                "points account '{}' appears more than once",
                account.id().as_str()
            )));
        }

        if !user_ids.contains(account.user_id()) {
            return Err(AppError::Validation(format!(
                "points account '{}' references unknown user '{}'",
                account.id().as_str(),
                account.user_id()
            )));
        }
    }

    Ok(())
}
