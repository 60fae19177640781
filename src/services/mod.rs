//! Services Layer
//!
//! Business logic over a database connection. Callers reach it directly or
//! through the repository implementations in `infrastructure`.

pub mod loan_service;

// Re-export for convenience
pub use loan_service::*;
