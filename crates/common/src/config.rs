//! Application configuration.

use serde::Deserialize;
use std::path::Path;

use crate::id::DEFAULT_MODIFICATION_CODE_LENGTH;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Poll limits.
    #[serde(default)]
    pub polls: PollConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Whether sqlx statement logging is enabled.
    #[serde(default)]
    pub sqlx_logging: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Poll limits.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Maximum number of options a poll may hold.
    #[serde(default = "default_max_options")]
    pub max_options: usize,
    /// Maximum number of poll IDs fetched in one batch.
    #[serde(default = "default_max_batch_ids")]
    pub max_batch_ids: usize,
    /// Page size used when a listing request omits one.
    #[serde(default = "default_list_limit")]
    pub default_list_limit: u64,
    /// Largest page size a listing request may ask for.
    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: u64,
    /// Length of generated modification codes.
    #[serde(default = "default_modification_code_length")]
    pub modification_code_length: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_options: default_max_options(),
            max_batch_ids: default_max_batch_ids(),
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
            modification_code_length: default_modification_code_length(),
        }
    }
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_log_filter() -> String {
    "quickpoll=info,sea_orm=warn".to_string()
}

const fn default_max_options() -> usize {
    20
}

const fn default_max_batch_ids() -> usize {
    50
}

const fn default_list_limit() -> u64 {
    10
}

const fn default_max_list_limit() -> u64 {
    100
}

const fn default_modification_code_length() -> usize {
    DEFAULT_MODIFICATION_CODE_LENGTH
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `QUICKPOLL_ENV`)
    /// 4. Environment variables with `QUICKPOLL__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("QUICKPOLL_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("QUICKPOLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("QUICKPOLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
