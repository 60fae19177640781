pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod services;

pub use infrastructure::config;
pub use infrastructure::db;
pub use infrastructure::seed;
