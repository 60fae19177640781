//! Domain error types
//!
//! Business-level failures of the loan workflow. Every variant except
//! `Storage` is detected before anything is committed.

use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum LoanError {
    /// The referenced book row does not exist
    #[error("book {0} not found")]
    BookNotFound(i32),
    /// The book exists but another loan holds it
    #[error("book {0} is already on loan")]
    BookUnavailable(i32),
    /// The loan to update does not exist
    #[error("loan {0} not found")]
    LoanNotFound(i32),
    /// The loan changed between the precondition read and the transaction
    #[error("loan {0} was modified concurrently")]
    Conflict(i32),
    /// Any database, connectivity or commit/rollback failure
    #[error("storage error: {0}")]
    Storage(#[from] DbErr),
}
