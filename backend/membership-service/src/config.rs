/// Configuration management for Membership Service
///
/// All settings come from environment variables; a `.env` file is loaded by
/// the binary before `Config::from_env` runs.
use entity_ordering::OrderingConfig;
use std::fmt;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Display-order maintenance settings
    pub ordering: OrderingConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Minimum number of pooled connections
    pub min_connections: u32,
    /// Connection acquisition timeout
    pub acquire_timeout_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if app_env.eq_ignore_ascii_case("production") => {
                return Err("DATABASE_URL must be set in production".to_string())
            }
            Err(_) => "postgresql://localhost/membership".to_string(),
        };

        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10);
        let min_connections = env_or("DATABASE_MIN_CONNECTIONS", 1);
        if min_connections > max_connections {
            return Err(format!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                min_connections, max_connections
            ));
        }

        Ok(Config {
            app: AppConfig {
                json_logs: std::env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
                env: app_env,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                acquire_timeout_secs: env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 10),
            },
            ordering: OrderingConfig::from_env(),
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
