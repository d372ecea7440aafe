//! Shared primitives for all Rust crates in Tally.

#![forbid(unsafe_code)]

/// Explicit per-request logging context.
pub mod context;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use context::RequestContext;

/// Result type used across Tally crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// Every variant maps to a stable machine code through [`AppError::code`] so
/// callers can render distinct messages without matching on display text.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or incomplete input, or a violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Maker-checker transaction already reached a terminal status.
    #[error("already decided: {0}")]
    AlreadyDecided(String),

    /// Persistence layer unavailable or query failure.
    #[error("data access error: {0}")]
    DataAccess(String),

    /// Best-effort notification channel failure.
    #[error("notification error: {0}")]
    Notification(String),
}

impl AppError {
    /// Returns the stable machine code for this error category.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::AlreadyDecided(_) => "already_decided",
            Self::DataAccess(_) => "data_access_error",
            Self::Notification(_) => "notification_error",
        }
    }

    /// Returns whether the caller may retry the failed operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataAccess(_) | Self::Notification(_))
    }

    /// Returns whether the error was caused by the caller's request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Unauthorized(_) | Self::AlreadyDecided(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn error_codes_are_distinct_for_decision_outcomes() {
        let already_decided = AppError::AlreadyDecided("transaction 't-1' is approved".to_owned());
        let not_found = AppError::NotFound("transaction 't-1'".to_owned());
        let unauthorized = AppError::Unauthorized("checker 'u-1'".to_owned());

        assert_eq!(already_decided.code(), "already_decided");
        assert_ne!(already_decided.code(), not_found.code());
        assert_ne!(already_decided.code(), unauthorized.code());
        assert_ne!(not_found.code(), unauthorized.code());
    }

    #[test]
    fn only_infrastructure_failures_are_retryable() {
        assert!(AppError::DataAccess("pool timed out".to_owned()).is_retryable());
        assert!(!AppError::Validation("bad input".to_owned()).is_retryable());
        assert!(!AppError::AlreadyDecided("done".to_owned()).is_retryable());
        assert!(AppError::AlreadyDecided("done".to_owned()).is_client_error());
        assert!(!AppError::DataAccess("down".to_owned()).is_client_error());
    }
}
