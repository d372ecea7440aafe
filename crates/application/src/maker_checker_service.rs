//! Maker-checker approval workflow.
//!
//! A maker proposes a gated action, the eligible checkers are notified on a
//! best-effort basis, and exactly one eligible checker decides it.
//!
//! Notification runs on a task owned by the service so a slow channel never
//! holds up the creation response. Call
//! [`MakerCheckerService::drain_notifications`] before shutdown; tasks still
//! pending when the last service handle is dropped are aborted.

use std::sync::Arc;

use chrono::Utc;
use tally_core::{AppError, AppResult, RequestContext};
use tally_domain::{
    CrudAction, Decision, ResourceName, Transaction, TransactionId, TransactionStatus, User,
    UserId,
};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::access_ports::UserRepository;
use crate::checker_service::maker_role;
use crate::notification::{ApprovalNotice, NotificationDispatcher};
use crate::transaction_ports::{CompareAndSetOutcome, DecisionUpdate, TransactionRepository};
use crate::{AccessService, CheckerResolution, CheckerService};

/// Input payload for proposing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransactionInput {
    /// Proposing user.
    pub maker_id: String,
    /// Gated action kind.
    pub action: CrudAction,
    /// Free-form description shown to checkers.
    pub description: String,
    /// Resource the action targets.
    pub resource_type: String,
}

/// Input payload for deciding a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecideTransactionInput {
    /// Transaction to decide.
    pub transaction_id: String,
    /// Deciding user.
    pub checker_id: String,
    /// `true` approves, `false` rejects.
    pub approve: bool,
}

/// Application service driving the transaction state machine.
#[derive(Clone)]
pub struct MakerCheckerService {
    access_service: AccessService,
    checker_service: CheckerService,
    user_repository: Arc<dyn UserRepository>,
    transaction_repository: Arc<dyn TransactionRepository>,
    notification_dispatcher: Arc<dyn NotificationDispatcher>,
    notifications: Arc<Mutex<JoinSet<()>>>,
}

impl MakerCheckerService {
    /// Creates a maker-checker service.
    #[must_use]
    pub fn new(
        access_service: AccessService,
        checker_service: CheckerService,
        user_repository: Arc<dyn UserRepository>,
        transaction_repository: Arc<dyn TransactionRepository>,
        notification_dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            access_service,
            checker_service,
            user_repository,
            transaction_repository,
            notification_dispatcher,
            notifications: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Records a pending transaction and schedules notification of its checkers.
    ///
    /// Returns once the transaction is stored. Notification problems are logged
    /// and never fail the creation.
    pub async fn create_transaction(
        &self,
        context: &RequestContext,
        input: CreateTransactionInput,
    ) -> AppResult<Transaction> {
        let maker_id = UserId::new(input.maker_id)?;
        let resource_type = ResourceName::new(input.resource_type)?;

        let maker = self
            .user_repository
            .find_user(&maker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{maker_id}' does not exist")))?;
        maker_role(&maker)?;

        let transaction = Transaction::propose(
            maker_id,
            input.action,
            input.description,
            resource_type,
            Utc::now(),
        )?;
        let transaction = self
            .transaction_repository
            .insert_transaction(transaction)
            .await?;

        info!(
            caller_id = context.caller_label(),
            caller_location = context.location_label(),
            transaction_id = %transaction.id(),
            maker_id = %transaction.maker_id(),
            action = transaction.action().as_str(),
            resource_type = %transaction.resource_type(),
            "transaction created"
        );

        self.spawn_notification(context, &transaction).await;

        Ok(transaction)
    }

    /// Waits for every scheduled notification to finish.
    pub async fn drain_notifications(&self) {
        let mut pending = std::mem::take(&mut *self.notifications.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(error) = result {
                warn!(error = %error, "notification task did not complete");
            }
        }
    }

    /// Applies a checker's decision to a pending transaction.
    pub async fn decide(
        &self,
        context: &RequestContext,
        input: DecideTransactionInput,
    ) -> AppResult<Transaction> {
        let transaction_id = TransactionId::parse(input.transaction_id.as_str())?;
        let checker_id = UserId::new(input.checker_id)?;
        let decision = Decision::from_approval(input.approve);

        let transaction = self.find_transaction(transaction_id).await?;
        if transaction.status().is_terminal() {
            return Err(transaction.already_decided_error());
        }

        self.ensure_eligible_checker(context, &transaction, &checker_id)
            .await?;

        let outcome = self
            .transaction_repository
            .compare_and_set_decision(DecisionUpdate {
                transaction_id,
                expected_status: TransactionStatus::Pending,
                decision,
                checker_id: checker_id.clone(),
                decided_at: Utc::now(),
            })
            .await?;

        match outcome {
            CompareAndSetOutcome::Updated(decided) => {
                info!(
                    caller_id = context.caller_label(),
                    caller_location = context.location_label(),
                    transaction_id = %decided.id(),
                    maker_id = %decided.maker_id(),
                    checker_id = %checker_id,
                    status = decided.status().as_str(),
                    "transaction decided"
                );
                Ok(decided)
            }
            CompareAndSetOutcome::Conflict => {
                warn!(
                    caller_id = context.caller_label(),
                    transaction_id = %transaction_id,
                    checker_id = %checker_id,
                    "lost decision race"
                );
                let current = self.find_transaction(transaction_id).await?;
                Err(current.already_decided_error())
            }
        }
    }

    /// Returns one transaction.
    pub async fn get_transaction(
        &self,
        _context: &RequestContext,
        transaction_id: &str,
    ) -> AppResult<Transaction> {
        let transaction_id = TransactionId::parse(transaction_id)?;
        self.find_transaction(transaction_id).await
    }

    async fn find_transaction(&self, transaction_id: TransactionId) -> AppResult<Transaction> {
        self.transaction_repository
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("transaction '{transaction_id}' does not exist"))
            })
    }

    async fn ensure_eligible_checker(
        &self,
        context: &RequestContext,
        transaction: &Transaction,
        checker_id: &UserId,
    ) -> AppResult<()> {
        let maker = self.find_user_or_unauthorized(transaction.maker_id(), "maker").await?;
        let checker = self.find_user_or_unauthorized(checker_id, "checker").await?;

        if checker.id() == maker.id() {
            return Err(AppError::Unauthorized(format!(
                "user '{checker_id}' cannot decide their own transaction '{}'",
                transaction.id()
            )));
        }

        let (Some(maker_role), Some(checker_role)) = (maker.role(), checker.role()) else {
            return Err(AppError::Unauthorized(format!(
                "user '{checker_id}' is not an eligible checker for transaction '{}'",
                transaction.id()
            )));
        };

        let eligible = self
            .access_service
            .checker_roles_for(context, maker_role)
            .await?
            .iter()
            .any(|role| &role.name == checker_role);

        if !eligible {
            return Err(AppError::Unauthorized(format!(
                "role '{checker_role}' may not approve transactions proposed by role '{maker_role}'"
            )));
        }

        Ok(())
    }

    async fn find_user_or_unauthorized(&self, user_id: &UserId, label: &str) -> AppResult<User> {
        self.user_repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("{label} '{user_id}' does not exist")))
    }

    async fn spawn_notification(&self, context: &RequestContext, transaction: &Transaction) {
        let checker_service = self.checker_service.clone();
        let dispatcher = self.notification_dispatcher.clone();
        let context = context.clone();
        let transaction = transaction.clone();

        let mut notifications = self.notifications.lock().await;
        while notifications.try_join_next().is_some() {}
        notifications.spawn(async move {
            notify_checkers(&checker_service, dispatcher.as_ref(), &context, &transaction).await;
        });
    }
}

async fn notify_checkers(
    checker_service: &CheckerService,
    dispatcher: &dyn NotificationDispatcher,
    context: &RequestContext,
    transaction: &Transaction,
) {
    let resolution = match checker_service
        .get_checkers(context, transaction.maker_id(), None)
        .await
    {
        Ok(resolution) => resolution,
        Err(error) => {
            warn!(
                caller_id = context.caller_label(),
                transaction_id = %transaction.id(),
                error = %error,
                "checker resolution failed, skipping notification"
            );
            return;
        }
    };

    let addresses = match resolution {
        CheckerResolution::NoEligibleCheckers => return,
        CheckerResolution::Eligible(_) => resolution.addresses(),
    };

    if addresses.is_empty() {
        warn!(
            caller_id = context.caller_label(),
            transaction_id = %transaction.id(),
            maker_id = %transaction.maker_id(),
            "no users hold a checker role, transaction stays pending unnotified"
        );
        return;
    }

    let notice = ApprovalNotice::for_transaction(transaction, addresses);
    if let Err(error) = dispatcher.notify(&notice).await {
        warn!(
            caller_id = context.caller_label(),
            transaction_id = %transaction.id(),
            error = %error,
            "failed to notify checkers"
        );
    }
}
