//! Maker-checker transaction lifecycle.
//!
//! A transaction starts `pending` and moves exactly once to `approved` or
//! `rejected`. Terminal records are immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{AppError, AppResult, NonEmptyString};
use uuid::Uuid;

use crate::{CrudAction, ResourceName, UserId};

/// Unique identifier for a maker-checker transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random transaction identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a transaction identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a transport value into a transaction identifier.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid transaction id '{value}': {error}")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting a checker decision.
    Pending,
    /// Approved by an eligible checker.
    Approved,
    /// Rejected by an eligible checker.
    Rejected,
}

impl TransactionStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown transaction status '{value}'"
            ))),
        }
    }

    /// Returns whether no further transitions are permitted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Checker verdict on a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Let the proposed action take effect.
    Approve,
    /// Refuse the proposed action.
    Reject,
}

impl Decision {
    /// Maps a boolean approval flag to a decision.
    #[must_use]
    pub fn from_approval(approve: bool) -> Self {
        if approve { Self::Approve } else { Self::Reject }
    }

    /// Returns the terminal status this decision produces.
    #[must_use]
    pub fn resulting_status(&self) -> TransactionStatus {
        match self {
            Self::Approve => TransactionStatus::Approved,
            Self::Reject => TransactionStatus::Rejected,
        }
    }
}

/// Flat storage shape of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Proposing user.
    pub maker_id: UserId,
    /// Deciding user, set once decided.
    pub checker_id: Option<UserId>,
    /// Gated action kind.
    pub action: CrudAction,
    /// Free-form description supplied by the maker.
    pub description: String,
    /// Resource the action targets.
    pub resource_type: ResourceName,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision timestamp, set once decided.
    pub decided_at: Option<DateTime<Utc>>,
}

/// Maker-checker transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    maker_id: UserId,
    checker_id: Option<UserId>,
    action: CrudAction,
    description: NonEmptyString,
    resource_type: ResourceName,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Proposes a new pending transaction.
    pub fn propose(
        maker_id: UserId,
        action: CrudAction,
        description: impl Into<String>,
        resource_type: ResourceName,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if !action.is_mutating() {
            return Err(AppError::Validation(format!(
                "action '{}' does not require approval",
                action.as_str()
            )));
        }

        let description = NonEmptyString::new(description.into().trim()).map_err(|_| {
            AppError::Validation("transaction description must not be empty".to_owned())
        })?;

        Ok(Self {
            id: TransactionId::new(),
            maker_id,
            checker_id: None,
            action,
            description,
            resource_type,
            status: TransactionStatus::Pending,
            created_at,
            decided_at: None,
        })
    }

    /// Rebuilds a transaction from storage, checking status consistency.
    pub fn from_record(record: TransactionRecord) -> AppResult<Self> {
        let decided_fields_present = record.checker_id.is_some() && record.decided_at.is_some();
        let decided_fields_absent = record.checker_id.is_none() && record.decided_at.is_none();

        let consistent = if record.status.is_terminal() {
            decided_fields_present
        } else {
            decided_fields_absent
        };

        if !consistent {
            return Err(AppError::Validation(format!(
                "transaction '{}' has status '{}' inconsistent with its decision fields",
                record.id,
                record.status.as_str()
            )));
        }

        Ok(Self {
            id: record.id,
            maker_id: record.maker_id,
            checker_id: record.checker_id,
            action: record.action,
            description: NonEmptyString::new(record.description)?,
            resource_type: record.resource_type,
            status: record.status,
            created_at: record.created_at,
            decided_at: record.decided_at,
        })
    }

    /// Returns the decided copy of a pending transaction.
    ///
    /// Fails with [`AppError::AlreadyDecided`] when the transaction is terminal.
    pub fn decide(
        &self,
        checker_id: UserId,
        decision: Decision,
        decided_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if self.status.is_terminal() {
            return Err(self.already_decided_error());
        }

        Ok(Self {
            checker_id: Some(checker_id),
            status: decision.resulting_status(),
            decided_at: Some(decided_at),
            ..self.clone()
        })
    }

    /// Error reported for any decision attempt on a terminal transaction.
    #[must_use]
    pub fn already_decided_error(&self) -> AppError {
        AppError::AlreadyDecided(format!(
            "transaction '{}' was already {}",
            self.id,
            self.status.as_str()
        ))
    }

    /// Returns the transaction identifier.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the proposing user.
    #[must_use]
    pub fn maker_id(&self) -> &UserId {
        &self.maker_id
    }

    /// Returns the deciding user, if decided.
    #[must_use]
    pub fn checker_id(&self) -> Option<&UserId> {
        self.checker_id.as_ref()
    }

    /// Returns the gated action kind.
    #[must_use]
    pub fn action(&self) -> CrudAction {
        self.action
    }

    /// Returns the maker's description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the targeted resource.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceName {
        &self.resource_type
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the decision timestamp, if decided.
    #[must_use]
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// Returns whether the gated action was approved.
    ///
    /// Applying the approved action to the protected resource is the
    /// integrator's responsibility.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == TransactionStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use tally_core::AppError;

    use super::{Decision, Transaction, TransactionId, TransactionRecord, TransactionStatus};
    use crate::{CrudAction, ResourceName, UserId};

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn pending() -> Transaction {
        Transaction::propose(
            user("maker-1"),
            CrudAction::Update,
            "raise balance for goodwill credit",
            ResourceName::new("points_ledger").unwrap_or_else(|_| unreachable!()),
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn proposal_starts_pending_without_checker() {
        let transaction = pending();
        assert_eq!(transaction.status(), TransactionStatus::Pending);
        assert!(transaction.checker_id().is_none());
        assert!(transaction.decided_at().is_none());
        assert!(!transaction.is_approved());
    }

    #[test]
    fn read_actions_are_not_gated() {
        let result = Transaction::propose(
            user("maker-1"),
            CrudAction::Read,
            "look at balances",
            ResourceName::new("points_ledger").unwrap_or_else(|_| unreachable!()),
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_description_is_rejected() {
        let result = Transaction::propose(
            user("maker-1"),
            CrudAction::Delete,
            "   ",
            ResourceName::new("user_storage").unwrap_or_else(|_| unreachable!()),
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn decision_stamps_checker_and_time() {
        let transaction = pending();
        let decided_at = transaction.created_at() + Duration::minutes(5);
        let decided = transaction.decide(user("checker-1"), Decision::Approve, decided_at);

        assert!(decided.is_ok());
        let decided = decided.unwrap_or_else(|_| unreachable!());
        assert_eq!(decided.status(), TransactionStatus::Approved);
        assert_eq!(decided.checker_id().map(UserId::as_str), Some("checker-1"));
        assert_eq!(decided.decided_at(), Some(decided_at));
        assert_eq!(decided.id(), transaction.id());
        assert!(decided.is_approved());
    }

    #[test]
    fn inconsistent_record_is_rejected() {
        let record = TransactionRecord {
            id: TransactionId::new(),
            maker_id: user("maker-1"),
            checker_id: None,
            action: CrudAction::Update,
            description: "adjust".to_owned(),
            resource_type: ResourceName::new("points_ledger").unwrap_or_else(|_| unreachable!()),
            status: TransactionStatus::Approved,
            created_at: Utc::now(),
            decided_at: None,
        };
        assert!(Transaction::from_record(record).is_err());
    }

    #[test]
    fn transaction_id_parse_rejects_garbage() {
        assert!(TransactionId::parse("not-a-uuid").is_err());
        let id = TransactionId::new();
        assert_eq!(TransactionId::parse(&id.to_string()).ok(), Some(id));
    }

    proptest! {
        #[test]
        fn terminal_transactions_never_change(
            first_approves in any::<bool>(),
            second_approves in any::<bool>(),
            checker in "[a-z0-9-]{1,12}",
        ) {
            let decided = pending()
                .decide(user("checker-1"), Decision::from_approval(first_approves), Utc::now())
                .unwrap_or_else(|_| unreachable!());

            let again = decided.decide(user(&checker), Decision::from_approval(second_approves), Utc::now());
            prop_assert!(matches!(again, Err(AppError::AlreadyDecided(_))));
            prop_assert_eq!(decided.checker_id().map(UserId::as_str), Some("checker-1"));
        }
    }
}
