//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::LoanRepository;
use crate::infrastructure::SeaOrmLoanRepository;

/// State shared by everything that issues loan operations
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Loan repository
    pub loan_repo: Arc<dyn LoanRepository>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection) -> Self {
        let loan_repo = Arc::new(SeaOrmLoanRepository::new(db.clone()));

        Self { db, loan_repo }
    }

    /// Connection pool, for read-only reporting outside the repository
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}
