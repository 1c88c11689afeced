//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::imports::{EmptyFilePolicy, ImportSettings};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/mdm";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Refresh throughput/ETA at least every this many rows.
pub const DEFAULT_PROGRESS_INTERVAL_ROWS: u64 = 100;

/// ...or after this many milliseconds.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

/// Default upload size cap (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Finished jobs are kept forever by default.
pub const DEFAULT_JOB_RETENTION_SECS: u64 = 0;

/// Longest a long-poll may hold a request open.
pub const DEFAULT_LONG_POLL_MAX_MS: u64 = 30_000;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub imports: ImportConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Where imported records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => anyhow::bail!("Unknown MDM_STORE '{}': expected 'memory' or 'postgres'", other),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Import engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub progress_interval_rows: u64,
    pub progress_interval_ms: u64,
    /// `true` fails empty uploads instead of completing them
    pub fail_empty_files: bool,
    pub max_upload_bytes: usize,
    pub job_retention_secs: u64,
    pub long_poll_max_ms: u64,
}

impl ImportConfig {
    pub fn settings(&self) -> ImportSettings {
        ImportSettings {
            progress_interval_rows: self.progress_interval_rows,
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            empty_file: if self.fail_empty_files {
                EmptyFilePolicy::Fail
            } else {
                EmptyFilePolicy::Complete
            },
        }
    }

    /// `None` keeps finished jobs forever
    pub fn retention(&self) -> Option<Duration> {
        (self.job_retention_secs > 0).then(|| Duration::from_secs(self.job_retention_secs))
    }

    pub fn long_poll_max(&self) -> Duration {
        Duration::from_millis(self.long_poll_max_ms)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let empty_file: EmptyFilePolicy = match std::env::var("IMPORT_EMPTY_FILE") {
            Ok(value) => value.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            Err(_) => EmptyFilePolicy::default(),
        };

        let store = match std::env::var("MDM_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        let config = Config {
            server: ServerConfig {
                host: std::env::var("MDM_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("MDM_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or("MDM_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            store,
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            imports: ImportConfig {
                progress_interval_rows: env_or(
                    "IMPORT_PROGRESS_INTERVAL_ROWS",
                    DEFAULT_PROGRESS_INTERVAL_ROWS,
                ),
                progress_interval_ms: env_or("IMPORT_PROGRESS_INTERVAL_MS", DEFAULT_PROGRESS_INTERVAL_MS),
                fail_empty_files: empty_file == EmptyFilePolicy::Fail,
                max_upload_bytes: env_or("IMPORT_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
                job_retention_secs: env_or("IMPORT_JOB_RETENTION_SECS", DEFAULT_JOB_RETENTION_SECS),
                long_poll_max_ms: env_or("IMPORT_LONG_POLL_MAX_MS", DEFAULT_LONG_POLL_MAX_MS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.store == StoreBackend::Postgres {
            if self.database.url.is_empty() {
                anyhow::bail!("Database URL cannot be empty");
            }

            if self.database.max_connections == 0 {
                anyhow::bail!("Database max_connections must be greater than 0");
            }

            if self.database.min_connections > self.database.max_connections {
                anyhow::bail!(
                    "Database min_connections ({}) cannot be greater than max_connections ({})",
                    self.database.min_connections,
                    self.database.max_connections
                );
            }
        }

        if self.imports.progress_interval_rows == 0 {
            anyhow::bail!("IMPORT_PROGRESS_INTERVAL_ROWS must be greater than 0");
        }

        if self.imports.max_upload_bytes == 0 {
            anyhow::bail!("IMPORT_MAX_UPLOAD_BYTES must be greater than 0");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            store: StoreBackend::Memory,
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            imports: ImportConfig {
                progress_interval_rows: DEFAULT_PROGRESS_INTERVAL_ROWS,
                progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
                fail_empty_files: false,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                job_retention_secs: DEFAULT_JOB_RETENTION_SECS,
                long_poll_max_ms: DEFAULT_LONG_POLL_MAX_MS,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.imports.retention(), None);
        assert_eq!(config.imports.long_poll_max(), Duration::from_secs(30));
    }

    #[test]
    fn test_import_settings_from_config() {
        let mut config = Config::default();
        config.imports.fail_empty_files = true;
        config.imports.progress_interval_ms = 250;

        let settings = config.imports.settings();
        assert_eq!(settings.empty_file, EmptyFilePolicy::Fail);
        assert_eq!(settings.progress_interval, Duration::from_millis(250));
        assert_eq!(settings.progress_interval_rows, 100);
    }

    #[test]
    fn test_invalid_pool_only_matters_for_postgres() {
        let mut config = Config::default();
        config.database.min_connections = 50;
        assert!(config.validate().is_ok());

        config.store = StoreBackend::Postgres;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_zero_progress_interval_rejected() {
        let mut config = Config::default();
        config.imports.progress_interval_rows = 0;
        assert!(config.validate().is_err());
    }
}
