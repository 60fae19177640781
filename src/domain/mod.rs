//! Domain layer - Pure business abstractions
//!
//! Loan types, the repository contract and the error taxonomy.
//! No connection handling lives here.

pub mod errors;
pub mod repositories;

pub use errors::LoanError;
pub use repositories::*;
