// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Raised by a wrapped business operation
    #[error("Operation failed: {0}")]
    Operation(String),

    /// A commit request was turned into a rollback because the transaction
    /// had been marked rollback-only
    #[error("Transaction rolled back because it has been marked as rollback-only: {0}")]
    UnexpectedRollback(String),

    /// Context/resource bookkeeping is corrupt. Never retried.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Illegal transaction state: {0}")]
    IllegalTransactionState(String),

    #[error("No transaction is active in this scope")]
    NoActiveTransaction,

    #[error("Database error: {0}")]
    Database(String),

    /// A write was refused because a suspended transaction on the same
    /// call stack holds the store's only write lock
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn is_unexpected_rollback(&self) -> bool {
        matches!(self, AppError::UnexpectedRollback(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AppError::InvariantViolation(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(AppError::UnexpectedRollback("outer".into()).is_unexpected_rollback());
        assert!(!AppError::Operation("boom".into()).is_unexpected_rollback());
        assert!(AppError::InvariantViolation("twice".into()).is_invariant_violation());
        assert!(!AppError::NoActiveTransaction.is_invariant_violation());
    }

    #[test]
    fn test_display() {
        let err = AppError::Operation("log write refused".into());
        assert_eq!(err.to_string(), "Operation failed: log write refused");

        let err = AppError::WriteConflict("outer holds the lock".into());
        assert_eq!(err.to_string(), "Write conflict: outer holds the lock");
        assert!(!err.is_unexpected_rollback());
    }
}
