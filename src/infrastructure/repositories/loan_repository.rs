//! SeaORM implementation of LoanRepository

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::domain::{Loan, LoanDraft, LoanError, LoanRepository};
use crate::services::loan_service;

/// SeaORM-based implementation of LoanRepository
pub struct SeaOrmLoanRepository {
    db: DatabaseConnection,
}

impl SeaOrmLoanRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LoanRepository for SeaOrmLoanRepository {
    async fn create(&self, draft: LoanDraft) -> Result<Loan, LoanError> {
        loan_service::create_loan(&self.db, draft).await
    }

    async fn find_all(&self) -> Result<Vec<Loan>, LoanError> {
        loan_service::list_loans(&self.db).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Loan>, LoanError> {
        loan_service::get_loan(&self.db, id).await
    }

    async fn update(&self, loan: Loan) -> Result<Loan, LoanError> {
        loan_service::update_loan(&self.db, loan).await
    }

    async fn delete(&self, id: i32) -> Result<(), LoanError> {
        loan_service::delete_loan(&self.db, id).await
    }
}
