//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::timeouts::{DEFAULT_LOCK_TIMEOUT, DEFAULT_STATEMENT_TIMEOUT};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,

    /// How long a transaction waits for a row lock, in milliseconds
    pub lock_timeout_ms: u64,

    /// Client-side bound on a single statement, in milliseconds
    pub statement_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    /// - `DB_LOCK_TIMEOUT_MS`: Row lock wait in milliseconds (default: 3000)
    /// - `DB_STATEMENT_TIMEOUT_MS`: Statement bound in milliseconds (default: 5000)
    ///
    /// # Errors
    ///
    /// * `ConfigError::MissingRequired` - `DATABASE_URL` is not set
    /// * `ConfigError::Invalid` - A numeric variable does not parse, or the
    ///   values fail [`validate`](Self::validate)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_url(None)
    }

    /// Like [`from_env`](Self::from_env), but `database_url_override` wins
    /// over `DATABASE_URL` when present
    pub fn from_env_with_url(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        let database_url = database_url_override
            .or_else(|| env::var("DATABASE_URL").ok())
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set it to a PostgreSQL connection string (see .env.example)".to_string(),
            })?;

        let config = Self {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5)?,
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", 600)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", 1800)?,
            lock_timeout_ms: parse_env_or(
                "DB_LOCK_TIMEOUT_MS",
                DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            )?,
            statement_timeout_ms: parse_env_or(
                "DB_STATEMENT_TIMEOUT_MS",
                DEFAULT_STATEMENT_TIMEOUT.as_millis() as u64,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate pool sizes and timeouts
    ///
    /// # Errors
    ///
    /// * `ConfigError::Invalid` - Empty pool, `min > max`, or a lock timeout
    ///   that is zero or not below the statement timeout
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!("Cannot exceed max connections ({})", self.max_connections),
            });
        }

        check_timeouts(self.lock_timeout(), self.statement_timeout())
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/ledger_db` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/ledger_db".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            statement_timeout_ms: DEFAULT_STATEMENT_TIMEOUT.as_millis() as u64,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Check that row-lock waits are bounded and end before the statement timeout
///
/// Postgres reads a `lock_timeout` of zero as "wait forever", and a lock wait
/// that outlives the statement timeout is cut off by the wrong error.
pub(crate) fn check_timeouts(
    lock_timeout: Duration,
    statement_timeout: Duration,
) -> Result<(), ConfigError> {
    if lock_timeout.is_zero() {
        return Err(ConfigError::Invalid {
            var: "DB_LOCK_TIMEOUT_MS".to_string(),
            reason: "Must be greater than 0 (0 disables the lock timeout)".to_string(),
        });
    }

    if lock_timeout >= statement_timeout {
        return Err(ConfigError::Invalid {
            var: "DB_LOCK_TIMEOUT_MS".to_string(),
            reason: format!(
                "Must be lower than statement timeout ({} ms)",
                statement_timeout.as_millis()
            ),
        });
    }

    Ok(())
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "DATABASE_URL",
        "DB_MAX_CONNECTIONS",
        "DB_MIN_CONNECTIONS",
        "DB_CONNECTION_TIMEOUT",
        "DB_IDLE_TIMEOUT",
        "DB_MAX_LIFETIME",
        "DB_LOCK_TIMEOUT_MS",
        "DB_STATEMENT_TIMEOUT_MS",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_database_url() {
        clear_env();
        let err = DatabaseConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired { ref var, .. } if var == "DATABASE_URL"
        ));
        assert!(err.to_string().contains("Hint"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        // SAFETY: serialized.
        unsafe { env::set_var("DATABASE_URL", "postgres://localhost/ledger_test") };

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://localhost/ledger_test");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.lock_timeout(), DEFAULT_LOCK_TIMEOUT);
        assert_eq!(config.statement_timeout(), DEFAULT_STATEMENT_TIMEOUT);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        clear_env();
        // SAFETY: serialized.
        unsafe {
            env::set_var("DATABASE_URL", "postgres://localhost/ledger_test");
            env::set_var("DB_LOCK_TIMEOUT_MS", "soon");
        }

        let err = DatabaseConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_LOCK_TIMEOUT_MS"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_url_override_wins() {
        clear_env();
        // SAFETY: serialized.
        unsafe { env::set_var("DATABASE_URL", "postgres://localhost/from_env") };

        let url = Some("postgres://localhost/from_flag".to_string());
        let config = DatabaseConfig::from_env_with_url(url).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/from_flag");
        clear_env();

        assert!(DatabaseConfig::from_env_with_url(Some("postgres://x/y".into())).is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unbounded_lock_wait() {
        clear_env();
        // SAFETY: serialized.
        unsafe {
            env::set_var("DATABASE_URL", "postgres://localhost/ledger_test");
            env::set_var("DB_LOCK_TIMEOUT_MS", "0");
        }

        let err = DatabaseConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_LOCK_TIMEOUT_MS"));

        // SAFETY: serialized.
        unsafe {
            env::set_var("DB_LOCK_TIMEOUT_MS", "5000");
            env::set_var("DB_STATEMENT_TIMEOUT_MS", "5000");
        }
        let err = DatabaseConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_LOCK_TIMEOUT_MS"));
        clear_env();
    }

    #[test]
    fn test_validate_pool_sizes() {
        let mut config = DatabaseConfig::development();
        assert!(config.validate().is_ok());

        config.min_connections = config.max_connections + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));

        config.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_timeouts() {
        let ms = Duration::from_millis;
        assert!(check_timeouts(ms(3000), ms(5000)).is_ok());
        assert!(check_timeouts(ms(0), ms(5000)).is_err());
        assert!(check_timeouts(ms(5000), ms(5000)).is_err());
        assert!(check_timeouts(ms(6000), ms(5000)).is_err());
    }

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.lock_timeout_ms, 3000);
    }
}
