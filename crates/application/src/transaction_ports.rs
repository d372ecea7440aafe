use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_core::AppResult;
use tally_domain::{Decision, Transaction, TransactionId, TransactionStatus, UserId};

/// Conditional decision write for one transaction.
///
/// Adapters apply it only while the stored status still equals
/// `expected_status`, in one atomic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionUpdate {
    /// Transaction to decide.
    pub transaction_id: TransactionId,
    /// Status the stored row must still have.
    pub expected_status: TransactionStatus,
    /// Checker's decision.
    pub decision: Decision,
    /// Deciding checker.
    pub checker_id: UserId,
    /// Decision timestamp.
    pub decided_at: DateTime<Utc>,
}

impl DecisionUpdate {
    /// Terminal status the update writes.
    #[must_use]
    pub fn new_status(&self) -> TransactionStatus {
        self.decision.resulting_status()
    }
}

/// Result of a compare-and-set decision write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareAndSetOutcome {
    /// The row matched and now holds the decision.
    Updated(Transaction),
    /// No row matched the expected status.
    Conflict,
}

/// Repository port for the maker-checker transaction ledger.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Appends a new transaction record.
    async fn insert_transaction(&self, transaction: Transaction) -> AppResult<Transaction>;

    /// Returns one transaction by id.
    async fn find_transaction(&self, transaction_id: TransactionId)
    -> AppResult<Option<Transaction>>;

    /// Atomically applies a decision if the stored status matches.
    async fn compare_and_set_decision(
        &self,
        update: DecisionUpdate,
    ) -> AppResult<CompareAndSetOutcome>;
}
