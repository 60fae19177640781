//! Repository implementations using SeaORM

pub mod loan_repository;

pub use loan_repository::SeaOrmLoanRepository;
