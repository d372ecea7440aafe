//! PostgreSQL-backed maker-checker ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tally_application::{CompareAndSetOutcome, DecisionUpdate, TransactionRepository};
use tally_core::{AppError, AppResult};
use tally_domain::{
    CrudAction, ResourceName, Transaction, TransactionId, TransactionRecord, TransactionStatus,
    UserId,
};
use uuid::Uuid;

/// PostgreSQL implementation of the transaction repository port.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    maker_id: String,
    checker_id: Option<String>,
    action: String,
    description: String,
    resource_type: String,
    status: String,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Self::from_record(TransactionRecord {
            id: TransactionId::from_uuid(row.id),
            maker_id: UserId::new(row.maker_id)?,
            checker_id: row.checker_id.map(UserId::new).transpose()?,
            action: row.action.parse::<CrudAction>()?,
            description: row.description,
            resource_type: ResourceName::new(row.resource_type)?,
            status: TransactionStatus::parse(row.status.as_str())?,
            created_at: row.created_at,
            decided_at: row.decided_at,
        })
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert_transaction(&self, transaction: Transaction) -> AppResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id,
                maker_id,
                checker_id,
                action,
                description,
                resource_type,
                status,
                created_at,
                decided_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, maker_id, checker_id, action, description,
                resource_type, status, created_at, decided_at
            "#,
        )
        .bind(transaction.id().as_uuid())
        .bind(transaction.maker_id().as_str())
        .bind(transaction.checker_id().map(UserId::as_str))
        .bind(transaction.action().as_str())
        .bind(transaction.description())
        .bind(transaction.resource_type().as_str())
        .bind(transaction.status().as_str())
        .bind(transaction.created_at())
        .bind(transaction.decided_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to insert transaction '{}': {error}",
                transaction.id()
            ))
        })?;

        Transaction::try_from(row)
    }

    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                id, maker_id, checker_id, action, description,
                resource_type, status, created_at, decided_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(transaction_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to find transaction '{transaction_id}': {error}"
            ))
        })?;

        row.map(Transaction::try_from).transpose()
    }

    async fn compare_and_set_decision(
        &self,
        update: DecisionUpdate,
    ) -> AppResult<CompareAndSetOutcome> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET status = $3, checker_id = $4, decided_at = $5
            WHERE id = $1 AND status = $2
            RETURNING
                id, maker_id, checker_id, action, description,
                resource_type, status, created_at, decided_at
            "#,
        )
        .bind(update.transaction_id.as_uuid())
        .bind(update.expected_status.as_str())
        .bind(update.new_status().as_str())
        .bind(update.checker_id.as_str())
        .bind(update.decided_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::DataAccess(format!(
                "failed to record decision for transaction '{}': {error}",
                update.transaction_id
            ))
        })?;

        match row {
            Some(row) => Ok(CompareAndSetOutcome::Updated(Transaction::try_from(row)?)),
            None => Ok(CompareAndSetOutcome::Conflict),
        }
    }
}
