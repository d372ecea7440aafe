use serde::{Deserialize, Serialize};
use tally_core::{AppError, AppResult};

use crate::UserId;

/// Identifier of a points account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointsAccountId(String);

impl PointsAccountId {
    /// Creates a validated points account identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "points account id must not be empty".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Points balance held by one user.
///
/// This is the resource maker-checker transactions gate on the
/// `points_ledger` resource; nothing in the workflow mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAccount {
    id: PointsAccountId,
    user_id: UserId,
    balance: i32,
}

impl PointsAccount {
    /// Creates a points account with a non-negative balance.
    pub fn new(id: PointsAccountId, user_id: UserId, balance: i32) -> AppResult<Self> {
        if balance < 0 {
            return Err(AppError::Validation(format!(
                "points account '{}' balance must not be negative, got {balance}",
                id.as_str()
            )));
        }

        Ok(Self {
            id,
            user_id,
            balance,
        })
    }

    /// Returns the account identifier.
    #[must_use]
    pub fn id(&self) -> &PointsAccountId {
        &self.id
    }

    /// Returns the owning user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the current balance.
    #[must_use]
    pub fn balance(&self) -> i32 {
        self.balance
    }
}
