use std::env;
use std::time::Duration;

use sea_orm::ConnectOptions;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub sql_logging: bool,
    pub seed_demo: bool,
    pub profile: String,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url(&profile));

        Self {
            database_url,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            acquire_timeout: Duration::from_secs(
                env::var("DB_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8),
            ),
            sql_logging: env::var("DB_SQL_LOGGING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            seed_demo: env::var("SEED_DEMO").is_ok(),
            profile,
        }
    }

    /// Pool options for this configuration
    pub fn connect_options(&self) -> ConnectOptions {
        let mut opts = ConnectOptions::new(self.database_url.clone());
        opts.max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .sqlx_logging(self.sql_logging);
        opts
    }
}

fn default_database_url(profile: &str) -> String {
    if profile == "default" {
        "sqlite://biblio_loans.db?mode=rwc".to_string()
    } else {
        format!("sqlite://biblio_loans_{}.db?mode=rwc", profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PROFILE",
            "DATABASE_URL",
            "DB_MAX_CONNECTIONS",
            "DB_ACQUIRE_TIMEOUT_SECS",
            "DB_SQL_LOGGING",
            "SEED_DEMO",
        ] {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn defaults_without_environment() {
        clear_env();
        let config = Config::from_env();

        assert_eq!(config.profile, "default");
        assert_eq!(config.database_url, "sqlite://biblio_loans.db?mode=rwc");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(8));
        assert!(!config.sql_logging);
        assert!(!config.seed_demo);
    }

    #[test]
    #[serial]
    fn profile_selects_its_own_database_file() {
        clear_env();
        unsafe { env::set_var("PROFILE", "branch2") };
        let config = Config::from_env();
        clear_env();

        assert_eq!(config.database_url, "sqlite://biblio_loans_branch2.db?mode=rwc");
    }

    #[test]
    #[serial]
    fn explicit_values_override_defaults() {
        clear_env();
        unsafe {
            env::set_var("PROFILE", "branch2");
            env::set_var("DATABASE_URL", "sqlite::memory:");
            env::set_var("DB_MAX_CONNECTIONS", "12");
            env::set_var("DB_ACQUIRE_TIMEOUT_SECS", "2");
            env::set_var("DB_SQL_LOGGING", "1");
            env::set_var("SEED_DEMO", "yes");
        }
        let config = Config::from_env();
        clear_env();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
        assert!(config.sql_logging);
        assert!(config.seed_demo);
    }

    #[test]
    #[serial]
    fn unparsable_numbers_fall_back() {
        clear_env();
        unsafe { env::set_var("DB_MAX_CONNECTIONS", "lots") };
        let config = Config::from_env();
        clear_env();

        assert_eq!(config.max_connections, 5);
    }
}
