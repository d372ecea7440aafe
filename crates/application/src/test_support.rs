use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tally_core::{AppError, AppResult};
use tally_domain::{
    EmailAddress, ResourceName, Role, RoleName, RolePermission, Transaction, TransactionId, User,
    UserId,
};
use tokio::sync::Mutex;

use crate::{
    ApprovalNotice, CompareAndSetOutcome, DecisionUpdate, NotificationDispatcher, RoleRepository,
    TransactionRepository, UserRepository, default_role_catalog,
};

pub(crate) fn role_name(value: &str) -> RoleName {
    RoleName::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn resource(value: &str) -> ResourceName {
    ResourceName::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn user_id(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn user(id: &str, role: Option<&str>) -> User {
    User::new(
        user_id(id),
        EmailAddress::new(format!("{id}@tally.test")).unwrap_or_else(|_| unreachable!()),
        id,
        "Test",
        role.map(role_name),
    )
}

/// Role, user, and ledger fake sharing one state, shaped like the seeded catalog.
#[derive(Default)]
pub(crate) struct FakeStore {
    roles: Mutex<HashMap<RoleName, Role>>,
    permissions: Mutex<HashMap<(RoleName, ResourceName), RolePermission>>,
    edges: Mutex<Vec<(RoleName, RoleName)>>,
    users: Mutex<HashMap<UserId, User>>,
    extra_role_members: Mutex<Vec<(RoleName, User)>>,
    transactions: Mutex<HashMap<TransactionId, Transaction>>,
    fail_role_member_lookups: AtomicBool,
}

impl FakeStore {
    /// Store holding the default catalog and one or two users per role.
    pub(crate) async fn seeded() -> Arc<Self> {
        let store = Arc::new(Self::default());
        let catalog = default_role_catalog().unwrap_or_else(|_| unreachable!());

        for seed in catalog.roles() {
            let role = Role::new(seed.name.clone());
            for grant in &seed.permissions {
                store.permissions.lock().await.insert(
                    (seed.name.clone(), grant.resource.clone()),
                    RolePermission::granting(role.id, grant.resource.clone(), &grant.actions),
                );
            }
            store.roles.lock().await.insert(seed.name.clone(), role);
        }

        for edge in catalog.edges() {
            store
                .edges
                .lock()
                .await
                .push((edge.maker_role().clone(), edge.checker_role().clone()));
        }

        for (id, role) in [
            ("owner-1", Some("owner")),
            ("manager-1", Some("manager")),
            ("manager-2", Some("manager")),
            ("engineer-1", Some("engineer")),
            ("engineer-2", Some("engineer")),
            ("pm-1", Some("product_manager")),
            ("customer-1", None),
        ] {
            store.insert_user(user(id, role)).await;
        }

        store
    }

    pub(crate) async fn insert_user(&self, user: User) {
        self.users.lock().await.insert(user.id().clone(), user);
    }

    pub(crate) async fn insert_role(&self, name: &str) {
        let name = role_name(name);
        self.roles.lock().await.insert(name.clone(), Role::new(name));
    }

    /// Inserts an edge without the domain's self-loop check.
    pub(crate) async fn insert_raw_edge(&self, maker: &str, checker: &str) {
        self.edges
            .lock()
            .await
            .push((role_name(maker), role_name(checker)));
    }

    /// Makes `find_users_by_role(role)` also return `user`.
    pub(crate) async fn list_user_under_role(&self, role: &str, user: User) {
        self.extra_role_members
            .lock()
            .await
            .push((role_name(role), user));
    }

    pub(crate) fn fail_role_member_lookups(&self) {
        self.fail_role_member_lookups.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn stored_transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl RoleRepository for FakeStore {
    async fn find_role_by_name(&self, name: &RoleName) -> AppResult<Option<Role>> {
        Ok(self.roles.lock().await.get(name).cloned())
    }

    async fn find_checker_roles(&self, maker_role: &RoleName) -> AppResult<Vec<Role>> {
        let roles = self.roles.lock().await;
        Ok(self
            .edges
            .lock()
            .await
            .iter()
            .filter(|(maker, _)| maker == maker_role)
            .filter_map(|(_, checker)| roles.get(checker).cloned())
            .collect())
    }

    async fn find_role_permission(
        &self,
        role: &RoleName,
        resource: &ResourceName,
    ) -> AppResult<Option<RolePermission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .get(&(role.clone(), resource.clone()))
            .cloned())
    }

    async fn list_role_permissions(&self, role: &RoleName) -> AppResult<Vec<RolePermission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .filter(|((name, _), _)| name == role)
            .map(|(_, permission)| permission.clone())
            .collect())
    }
}

#[async_trait]
impl UserRepository for FakeStore {
    async fn find_user(&self, user_id: &UserId) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(user_id).cloned())
    }

    async fn find_users_by_role(&self, role: &RoleName) -> AppResult<Vec<User>> {
        if self.fail_role_member_lookups.load(Ordering::SeqCst) {
            return Err(AppError::DataAccess("users table unavailable".to_owned()));
        }

        let mut members: Vec<User> = self
            .users
            .lock()
            .await
            .values()
            .filter(|user| user.role() == Some(role))
            .cloned()
            .collect();

        members.extend(
            self.extra_role_members
                .lock()
                .await
                .iter()
                .filter(|(name, _)| name == role)
                .map(|(_, user)| user.clone()),
        );

        Ok(members)
    }
}

#[async_trait]
impl TransactionRepository for FakeStore {
    async fn insert_transaction(&self, transaction: Transaction) -> AppResult<Transaction> {
        self.transactions
            .lock()
            .await
            .insert(transaction.id(), transaction.clone());
        Ok(transaction)
    }

    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<Transaction>> {
        Ok(self.transactions.lock().await.get(&transaction_id).cloned())
    }

    async fn compare_and_set_decision(
        &self,
        update: DecisionUpdate,
    ) -> AppResult<CompareAndSetOutcome> {
        let mut transactions = self.transactions.lock().await;
        let Some(stored) = transactions.get_mut(&update.transaction_id) else {
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

/// Dispatcher that records every notice it receives.
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    pub(crate) notices: Mutex<Vec<ApprovalNotice>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, notice: &ApprovalNotice) -> AppResult<()> {
        self.notices.lock().await.push(notice.clone());
        Ok(())
    }
}

/// Dispatcher that always fails.
#[derive(Default)]
pub(crate) struct FailingDispatcher {
    pub(crate) attempts: Mutex<usize>,
}

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn notify(&self, _notice: &ApprovalNotice) -> AppResult<()> {
        *self.attempts.lock().await += 1;
        Err(AppError::Notification("smtp relay refused connection".to_owned()))
    }
}

/// Dispatcher whose delivery never completes.
#[derive(Default)]
pub(crate) struct HangingDispatcher {
    pub(crate) entered: Mutex<usize>,
}

#[async_trait]
impl NotificationDispatcher for HangingDispatcher {
    async fn notify(&self, _notice: &ApprovalNotice) -> AppResult<()> {
        *self.entered.lock().await += 1;
        std::future::pending::<()>().await;
        Ok(())
    }
}
