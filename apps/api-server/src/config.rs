//! API server configuration.
//!
//! ## Sources (later wins)
//! ```text
//! built-in defaults
//!      │
//!      ▼
//! shopkeep.toml            (optional; path from SHOPKEEP_CONFIG)
//!      │
//!      ▼
//! SHOPKEEP__SECTION__KEY   (e.g. SHOPKEEP__SERVER__PORT=8080)
//! ```

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SHOPKEEP_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "shopkeep.toml";

/// Full server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
    /// Lifetime of tokens minted by [`crate::auth::JwtManager`]
    pub access_token_lifetime_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Days before expiry at which an expiring-soon alert fires
    pub expiring_soon_days: i64,
    /// Repayment term for debts opened at checkout
    pub debt_term_days: i64,
}

impl AppConfig {
    /// Loads defaults, the optional TOML file and `SHOPKEEP__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config: AppConfig = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("SHOPKEEP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Builder pre-loaded with the built-in defaults.
    pub(crate) fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("database.path", "./shopkeep.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.jwt_secret", "shopkeep-dev-secret-change-in-production")?
            .set_default("auth.access_token_lifetime_secs", 86_400)?
            .set_default("alerts.expiring_soon_days", shopkeep_core::EXPIRING_SOON_DAYS)?
            .set_default("alerts.debt_term_days", shopkeep_core::DEFAULT_DEBT_TERM_DAYS)?)
    }

    /// Rejects values the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.alerts.expiring_soon_days < 0 || self.alerts.debt_term_days <= 0 {
            return Err(ConfigError::InvalidValue("alerts".to_string()));
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
