//! Repository trait definitions
//!
//! These traits define the contract for loan data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::LoanError;
use crate::models::loan;

/// A persisted loan. Every existing loan is active; deleting it ends the loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub borrower_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Input for creating a loan; the id is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDraft {
    pub book_id: i32,
    pub borrower_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl From<loan::Model> for Loan {
    fn from(row: loan::Model) -> Self {
        Loan {
            id: row.id,
            book_id: row.book_id,
            borrower_id: row.borrower_id,
            loan_date: row.loan_date,
            due_date: row.due_date,
        }
    }
}

/// A book whose availability flag disagrees with the loans referencing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityMismatch {
    pub book_id: i32,
    pub available: bool,
    pub loan_count: u64,
}

/// Repository trait for Loan entity
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Loan a book; fails if the book is missing or already loaned
    async fn create(&self, draft: LoanDraft) -> Result<Loan, LoanError>;

    /// All loans, most recent first
    async fn find_all(&self) -> Result<Vec<Loan>, LoanError>;

    /// Find a loan by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Loan>, LoanError>;

    /// Rewrite every field of an existing loan, moving the hold when the book changes
    async fn update(&self, loan: Loan) -> Result<Loan, LoanError>;

    /// End a loan and release its book. Missing loans are ignored.
    /// Returns `Conflict` if a concurrent update moved the loan to another book.
    async fn delete(&self, id: i32) -> Result<(), LoanError>;
}
