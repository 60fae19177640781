//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and schema (db)
//! - Configuration loading (config)
//! - Demo data (seed)
//! - Repository implementations (repositories)
//! - Application state (state)

pub mod config;
pub mod db;
pub mod repositories;
pub mod seed;
pub mod state;

pub use repositories::*;
pub use state::AppState;
