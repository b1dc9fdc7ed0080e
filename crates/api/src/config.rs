//! Application configuration loaded from environment variables.

use std::time::Duration;

use catalog::{CircuitBreakerConfig, HttpCatalogConfig};
use domain::OrderServiceConfig;
use thiserror::Error;

/// Errors produced while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST` (default `0.0.0.0`), `PORT` (default `3000`)
/// - `RUST_LOG` (default `info`), `LOG_FORMAT` (`json` or `pretty`)
/// - `DATABASE_URL` (optional; the in-memory store is used without it),
///   `DB_MAX_CONNECTIONS` (10), `DB_TIMEOUT` (3s)
/// - `CATALOG_SERVICE_URL` (required), `CATALOG_ITEMS_PATH` (`/items`),
///   `HTTP_TIMEOUT` (3s), `CATALOG_CONCURRENCY` (5),
///   `CATALOG_BATCH_TIMEOUT` (10s)
/// - `CIRCUIT_THRESHOLD` (5), `CIRCUIT_COOLDOWN` (30s)
/// - `ORDERS_ENABLE_IDEMPOTENCY` (false)
///
/// Durations accept `500ms`, `3s`, `2m`, `1h` or bare seconds.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout: Duration,
    pub catalog_url: String,
    pub catalog_items_path: String,
    pub http_timeout: Duration,
    pub catalog_concurrency: usize,
    pub catalog_batch_timeout: Duration,
    pub circuit_threshold: u32,
    pub circuit_cooldown: Duration,
    pub idempotency_enabled: bool,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let catalog_url = get("CATALOG_SERVICE_URL").ok_or(ConfigError::Missing("CATALOG_SERVICE_URL"))?;

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match get("LOG_FORMAT") {
                Some(v) => parse_log_format(&v)?,
                None => defaults.log_format,
            },
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                get("DB_MAX_CONNECTIONS"),
                defaults.db_max_connections,
            )?,
            db_timeout: duration_or("DB_TIMEOUT", get("DB_TIMEOUT"), defaults.db_timeout)?,
            catalog_url,
            catalog_items_path: get("CATALOG_ITEMS_PATH").unwrap_or(defaults.catalog_items_path),
            http_timeout: duration_or("HTTP_TIMEOUT", get("HTTP_TIMEOUT"), defaults.http_timeout)?,
            catalog_concurrency: parse_or(
                "CATALOG_CONCURRENCY",
                get("CATALOG_CONCURRENCY"),
                defaults.catalog_concurrency,
            )?,
            catalog_batch_timeout: duration_or(
                "CATALOG_BATCH_TIMEOUT",
                get("CATALOG_BATCH_TIMEOUT"),
                defaults.catalog_batch_timeout,
            )?,
            circuit_threshold: parse_or(
                "CIRCUIT_THRESHOLD",
                get("CIRCUIT_THRESHOLD"),
                defaults.circuit_threshold,
            )?,
            circuit_cooldown: duration_or(
                "CIRCUIT_COOLDOWN",
                get("CIRCUIT_COOLDOWN"),
                defaults.circuit_cooldown,
            )?,
            idempotency_enabled: match get("ORDERS_ENABLE_IDEMPOTENCY") {
                Some(v) => parse_bool("ORDERS_ENABLE_IDEMPOTENCY", &v)?,
                None => defaults.idempotency_enabled,
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn catalog_config(&self) -> HttpCatalogConfig {
        HttpCatalogConfig {
            base_url: self.catalog_url.clone(),
            items_path: self.catalog_items_path.clone(),
            timeout: self.http_timeout,
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_threshold,
            cooldown: self.circuit_cooldown,
        }
    }

    pub fn service_config(&self) -> OrderServiceConfig {
        OrderServiceConfig {
            idempotency_enabled: self.idempotency_enabled,
            catalog_timeout: self.catalog_batch_timeout,
            db_timeout: self.db_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            db_max_connections: 10,
            db_timeout: Duration::from_secs(3),
            catalog_url: "http://localhost:8080".to_string(),
            catalog_items_path: "/items".to_string(),
            http_timeout: Duration::from_secs(3),
            catalog_concurrency: 5,
            catalog_batch_timeout: Duration::from_secs(10),
            circuit_threshold: 5,
            circuit_cooldown: Duration::from_secs(30),
            idempotency_enabled: false,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.trim().parse().map_err(|e: T::Err| invalid(key, &v, e.to_string())),
        None => Ok(default),
    }
}

fn duration_or(
    key: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(v) => parse_duration(&v).ok_or_else(|| invalid(key, &v, "expected e.g. 500ms, 3s or 2m")),
        None => Ok(default),
    }
}

/// Parses `500ms`, `3s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let (digits, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => input.split_at(split),
        None => (input, "s"),
    };
    let amount: u64 = digits.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" | "text" => Ok(LogFormat::Pretty),
        _ => Err(invalid("LOG_FORMAT", value, "expected json or pretty")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[("CATALOG_SERVICE_URL", "http://catalog:8080")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.database_url.is_none());
        assert_eq!(config.db_timeout, Duration::from_secs(3));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.catalog_concurrency, 5);
        assert_eq!(config.circuit_threshold, 5);
        assert_eq!(config.circuit_cooldown, Duration::from_secs(30));
        assert!(!config.idempotency_enabled);
    }

    #[test]
    fn test_catalog_url_is_required() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::Missing("CATALOG_SERVICE_URL")
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CATALOG_SERVICE_URL", "http://catalog:8080"),
            ("PORT", "8081"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DB_TIMEOUT", "500ms"),
            ("HTTP_TIMEOUT", "2"),
            ("CIRCUIT_COOLDOWN", "1m"),
            ("CIRCUIT_THRESHOLD", "3"),
            ("ORDERS_ENABLE_IDEMPOTENCY", "true"),
        ])
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.db_timeout, Duration::from_millis(500));
        assert_eq!(config.http_timeout, Duration::from_secs(2));
        assert_eq!(config.breaker_config().cooldown, Duration::from_secs(60));
        assert_eq!(config.breaker_config().failure_threshold, 3);
        assert!(config.service_config().idempotency_enabled);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = load(&[("CATALOG_SERVICE_URL", "http://c"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = load(&[("CATALOG_SERVICE_URL", "http://c"), ("DB_TIMEOUT", "3 weeks")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_TIMEOUT", .. }));

        let err = load(&[
            ("CATALOG_SERVICE_URL", "http://c"),
            ("ORDERS_ENABLE_IDEMPOTENCY", "maybe"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "ORDERS_ENABLE_IDEMPOTENCY",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("3s"), Some(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("ms"), None);
        assert_eq!(parse_duration("1.5s"), None);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
