use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::circuit_breaker::CircuitBreakerSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("ORDER_STORAGE must be 'postgres' or 'memory', got '{0}'")]
    InvalidStorage(String),
}

/// Where orders are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    Postgres,
    Memory,
}

impl FromStr for StorageEngine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageEngine::Postgres),
            "memory" => Ok(StorageEngine::Memory),
            _ => Err(ConfigError::InvalidStorage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageEngine,
    pub database_url: String,
    pub payment_service_url: String,
    pub http_timeout: Duration,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Config {
    /// Reads the process environment (after `.env`, if the caller loaded it).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, applying defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                string("DATABASE_USER", "postgres"),
                string("DATABASE_PASSWORD", "postgres"),
                string("DATABASE_HOST", "localhost"),
                string("DATABASE_PORT", "5432"),
                string("DATABASE_DBNAME", "orders"),
            ),
        };

        Ok(Config {
            host: string("HOST", "0.0.0.0"),
            port: number(&lookup, "PORT", 8000)?,
            storage: string("ORDER_STORAGE", "postgres").parse()?,
            database_url,
            payment_service_url: string("FASTFOOD_PAYMENT_APP_URL", "http://localhost:8001"),
            http_timeout: Duration::from_secs(number(&lookup, "HTTP_TIMEOUT_SECS", 5)?),
            circuit_breaker: CircuitBreakerSettings {
                failure_threshold: number(&lookup, "CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
                interval: Duration::from_secs(number(
                    &lookup,
                    "CIRCUIT_BREAKER_INTERVAL_SECS",
                    60,
                )?),
                timeout: Duration::from_secs(number(&lookup, "CIRCUIT_BREAKER_TIMEOUT_SECS", 30)?),
                max_requests: number(&lookup, "CIRCUIT_BREAKER_MAX_REQUESTS", 5)?,
            },
        })
    }
}

fn number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}
