//! CLI configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use wager_ledger::db::{self, DatabaseConfig};

/// Complete configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Fixed seed for wager outcomes; OS entropy when unset
    pub wager_seed: Option<u64>,
}

impl CliConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_env_with_url(database_url_override)?;

        let wager_seed = match std::env::var("WAGER_SEED") {
            Ok(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "WAGER_SEED".to_string(),
                reason: "Must be an unsigned 64-bit integer".to_string(),
            })?),
            Err(_) => None,
        };

        Ok(CliConfig {
            database,
            wager_seed,
        })
    }

    /// Validate configuration after loading
    ///
    /// Pool and timeout rules live with `DatabaseConfig` so library users get
    /// the same checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Database(#[from] db::ConfigError),

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
