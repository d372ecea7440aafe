//! In-memory adapter for every persistence port.
//!
//! Enforces the same keys and role references as the SQL schema so services
//! can be exercised without a database. Points and transactions hold user ids
//! without checking them, as the schema does.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tally_application::{
    CompareAndSetOutcome, DecisionUpdate, RoleRepository, SeedRepository, TransactionRepository,
    UserRepository,
};
use tally_core::{AppError, AppResult};
use tally_domain::{
    ApprovalChainEdge, PointsAccount, PointsAccountId, ResourceName, Role, RoleId, RoleName,
    RolePermission, Transaction, TransactionId, User, UserId,
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    roles: BTreeMap<RoleName, Role>,
    permissions: HashMap<(RoleId, ResourceName), RolePermission>,
    approval_edges: HashSet<(RoleId, RoleId)>,
    users: BTreeMap<UserId, User>,
    points: HashMap<PointsAccountId, PointsAccount>,
    transactions: HashMap<TransactionId, Transaction>,
}

impl StoreState {
    fn role_id(&self, name: &RoleName) -> AppResult<RoleId> {
        self.roles
            .get(name)
            .map(|role| role.id)
            .ok_or_else(|| AppError::NotFound(format!("role '{name}' does not exist")))
    }
}

/// In-memory store implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn find_role_by_name(&self, name: &RoleName) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(name).cloned())
    }

    async fn find_checker_roles(&self, maker_role: &RoleName) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let Some(maker) = state.roles.get(maker_role) else {
            return Ok(Vec::new());
        };

        Ok(state
            .roles
            .values()
            .filter(|checker| state.approval_edges.contains(&(maker.id, checker.id)))
            .cloned()
            .collect())
    }

    async fn find_role_permission(
        &self,
        role: &RoleName,
        resource: &ResourceName,
    ) -> AppResult<Option<RolePermission>> {
        let state = self.state.read().await;
        let Some(role) = state.roles.get(role) else {
            return Ok(None);
        };

        Ok(state
            .permissions
            .get(&(role.id, resource.clone()))
            .cloned())
    }

    async fn list_role_permissions(&self, role: &RoleName) -> AppResult<Vec<RolePermission>> {
        let state = self.state.read().await;
        let Some(role) = state.roles.get(role) else {
            return Ok(Vec::new());
        };

        let mut permissions: Vec<RolePermission> = state
            .permissions
            .values()
            .filter(|permission| permission.role_id == role.id)
            .cloned()
            .collect();
        permissions.sort_by(|left, right| left.resource.cmp(&right.resource));

        Ok(permissions)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user(&self, user_id: &UserId) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn find_users_by_role(&self, role: &RoleName) -> AppResult<Vec<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|user| user.role() == Some(role))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert_transaction(&self, transaction: Transaction) -> AppResult<Transaction> {
        let mut state = self.state.write().await;

        if state.transactions.contains_key(&transaction.id()) {
            return Err(AppError::DataAccess(format!(
                "transaction '{}' already exists",
                transaction.id()
            )));
        }

        state
            .transactions
            .insert(transaction.id(), transaction.clone());
        Ok(transaction)
    }

    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<Transaction>> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .get(&transaction_id)
            .cloned())
    }

    async fn compare_and_set_decision(
        &self,
        update: DecisionUpdate,
    ) -> AppResult<CompareAndSetOutcome> {
        let mut state = self.state.write().await;
        let Some(stored) = state.transactions.get_mut(&update.transaction_id) else {
            return Ok(CompareAndSetOutcome::Conflict);
        };

        if stored.status() != update.expected_status {
            return Ok(CompareAndSetOutcome::Conflict);
        }

        let decided = stored.decide(update.checker_id, update.decision, update.decided_at)?;
        *stored = decided.clone();

        Ok(CompareAndSetOutcome::Updated(decided))
    }
}

#[async_trait]
impl SeedRepository for InMemoryStore {
    async fn clear_all(&self) -> AppResult<()> {
        *self.state.write().await = StoreState::default();
        Ok(())
    }

    async fn insert_role(&self, role: &Role, permissions: &[RolePermission]) -> AppResult<()> {
        let mut state = self.state.write().await;

        if state.roles.contains_key(&role.name) {
            return Err(AppError::DataAccess(format!(
                "role '{}' already exists",
                role.name
            )));
        }

        for permission in permissions {
            let key = (role.id, permission.resource.clone());
            if state.permissions.contains_key(&key) {
                return Err(AppError::DataAccess(format!(
                    "role '{}' already has a grant on '{}'",
                    role.name, permission.resource
                )));
            }

            state.permissions.insert(
                key,
                RolePermission {
                    role_id: role.id,
                    ..permission.clone()
                },
            );
        }

        state.roles.insert(role.name.clone(), role.clone());
        Ok(())
    }

    async fn insert_approval_edge(&self, edge: &ApprovalChainEdge) -> AppResult<()> {
        let mut state = self.state.write().await;
        let maker = state.role_id(edge.maker_role())?;
        let checker = state.role_id(edge.checker_role())?;

        if !state.approval_edges.insert((maker, checker)) {
            return Err(AppError::DataAccess(format!(
                "approval chain edge '{}' -> '{}' already exists",
                edge.maker_role(),
                edge.checker_role()
            )));
        }

        Ok(())
    }

    async fn insert_users(&self, users: &[User]) -> AppResult<u64> {
        let mut state = self.state.write().await;

        for user in users {
            if let Some(role) = user.role()
                && !state.roles.contains_key(role)
            {
                return Err(AppError::Validation(format!(
                    "user '{}' references unknown role '{role}'",
                    user.id()
                )));
            }

            if state.users.contains_key(user.id()) {
                return Err(AppError::DataAccess(format!(
                    "user '{}' already exists",
                    user.id()
                )));
            }
        }

        for user in users {
            state.users.insert(user.id().clone(), user.clone());
        }

        Ok(users.len() as u64)
    }

    async fn insert_points_accounts(&self, accounts: &[PointsAccount]) -> AppResult<u64> {
        let mut state = self.state.write().await;

        for account in accounts {
            if state.points.contains_key(account.id()) {
                return Err(AppError::DataAccess(format!(
                    "points account '{}' already exists",
                    account.id().as_str()
                )));
            }
        }

        for account in accounts {
            state.points.insert(account.id().clone(), account.clone());
        }

        Ok(accounts.len() as u64)
    }
}
