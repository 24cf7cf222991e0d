//! Environment-driven application settings.

use std::env;
use std::time::Duration;

use derive_more::Display;
use thiserror::Error;

use crate::config::db::RetryPolicy;
use crate::utils::logger::LogFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("DATABASE_URL must be set when STORAGE_BACKEND is postgres")]
    MissingDatabaseUrl,
    #[error("DB_POOL_MAX_SIZE must be greater than zero")]
    ZeroPoolSize,
    #[error("STORAGE_TIMEOUT_MS must be greater than zero")]
    ZeroTimeout,
    #[error("DB_CONNECT_RETRIES must be greater than zero")]
    ZeroRetries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AppEnv {
    #[display(fmt = "development")]
    Development,
    #[display(fmt = "production")]
    Production,
    #[display(fmt = "test")]
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StorageBackend {
    #[display(fmt = "postgres")]
    Postgres,
    #[display(fmt = "memory")]
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_name: String,
    pub app_version: String,
    pub environment: AppEnv,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_pool_max_size: u32,
    pub storage_timeout: Duration,
    pub db_retry: RetryPolicy,
    pub cors_origins: CorsOrigins,
    pub request_size_limit: usize,
    pub log_format: LogFormat,
    /// Serves `/health` and `/ping` when set.
    pub health_check_enabled: bool,
    /// Wraps the app in the per-request tracing middleware when set.
    pub enable_request_logging: bool,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds and validates a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let config = AppConfig {
            host: read("APP_HOST", "0.0.0.0"),
            port: parse("APP_PORT", read("APP_PORT", "3000"))?,
            app_name: read("APP_NAME", "Pupil Registration Backend"),
            app_version: read("APP_VERSION", env!("CARGO_PKG_VERSION")),
            environment: parse_env(read("APP_ENV", "development"))?,
            storage_backend: parse_backend(read("STORAGE_BACKEND", "postgres"))?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_pool_max_size: parse("DB_POOL_MAX_SIZE", read("DB_POOL_MAX_SIZE", "10"))?,
            storage_timeout: Duration::from_millis(parse(
                "STORAGE_TIMEOUT_MS",
                read("STORAGE_TIMEOUT_MS", "5000"),
            )?),
            db_retry: RetryPolicy {
                attempts: parse("DB_CONNECT_RETRIES", read("DB_CONNECT_RETRIES", "5"))?,
                delay: Duration::from_millis(parse(
                    "DB_RETRY_DELAY_MS",
                    read("DB_RETRY_DELAY_MS", "5000"),
                )?),
            },
            cors_origins: parse_origins(&read("CORS_ORIGIN", "*")),
            request_size_limit: parse(
                "REQUEST_SIZE_LIMIT",
                read("REQUEST_SIZE_LIMIT", "10485760"),
            )?,
            log_format: read("LOG_FORMAT", "text")
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: read("LOG_FORMAT", "text"),
                })?,
            health_check_enabled: read("HEALTH_CHECK_ENABLED", "true") != "false",
            enable_request_logging: read("ENABLE_REQUEST_LOGGING", "false") == "true",
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.db_pool_max_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if self.storage_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.db_retry.attempts == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_env(value: String) -> Result<AppEnv, ConfigError> {
    match value.to_lowercase().as_str() {
        "development" => Ok(AppEnv::Development),
        "production" => Ok(AppEnv::Production),
        "test" => Ok(AppEnv::Test),
        _ => Err(ConfigError::Invalid {
            key: "APP_ENV",
            value,
        }),
    }
}

fn parse_backend(value: String) -> Result<StorageBackend, ConfigError> {
    match value.to_lowercase().as_str() {
        "postgres" => Ok(StorageBackend::Postgres),
        "memory" => Ok(StorageBackend::Memory),
        _ => Err(ConfigError::Invalid {
            key: "STORAGE_BACKEND",
            value,
        }),
    }
}

fn parse_origins(value: &str) -> CorsOrigins {
    if value == "*" {
        return CorsOrigins::Any;
    }
    CorsOrigins::List(
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("STORAGE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.bind_address(), ("0.0.0.0".to_string(), 3000));
        assert_eq!(config.app_name, "Pupil Registration Backend");
        assert_eq!(config.environment, AppEnv::Development);
        assert_eq!(config.db_pool_max_size, 10);
        assert_eq!(config.storage_timeout, Duration::from_millis(5000));
        assert_eq!(config.cors_origins, CorsOrigins::Any);
        assert_eq!(config.request_size_limit, 10 * 1024 * 1024);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.app_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.db_retry, RetryPolicy::default());
        assert!(config.health_check_enabled);
        assert!(!config.enable_request_logging);
    }

    #[test]
    fn test_feature_switches() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("APP_VERSION", "1.0.0"),
            ("HEALTH_CHECK_ENABLED", "false"),
            ("ENABLE_REQUEST_LOGGING", "true"),
            ("DB_CONNECT_RETRIES", "2"),
            ("DB_RETRY_DELAY_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.app_version, "1.0.0");
        assert!(!config.health_check_enabled);
        assert!(config.enable_request_logging);
        assert_eq!(
            config.db_retry,
            RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(250)
            }
        );

        // Only an explicit "false" turns health checks off.
        let config = config_from(&[("STORAGE_BACKEND", "memory"), ("HEALTH_CHECK_ENABLED", "no")])
            .unwrap();
        assert!(config.health_check_enabled);
        assert_eq!(
            config_from(&[("STORAGE_BACKEND", "memory"), ("DB_CONNECT_RETRIES", "0")])
                .unwrap_err(),
            ConfigError::ZeroRetries
        );
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert_eq!(config_from(&[]).unwrap_err(), ConfigError::MissingDatabaseUrl);
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/pupils")]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            config_from(&[("STORAGE_BACKEND", "memory"), ("APP_PORT", "70000")]).unwrap_err(),
            ConfigError::Invalid {
                key: "APP_PORT",
                value: "70000".into()
            }
        );
        assert_eq!(
            config_from(&[("STORAGE_BACKEND", "memory"), ("STORAGE_TIMEOUT_MS", "0")])
                .unwrap_err(),
            ConfigError::ZeroTimeout
        );
        assert!(matches!(
            config_from(&[("STORAGE_BACKEND", "mongo")]),
            Err(ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                ..
            })
        ));
    }

    #[test]
    fn test_reads_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "STORAGE_BACKEND=memory").unwrap();
        writeln!(file, "APP_PORT=8080").unwrap();
        writeln!(file, "CORS_ORIGIN=\"http://localhost:5173, https://school.example\"").unwrap();
        writeln!(file, "LOG_FORMAT=json").unwrap();

        let vars: HashMap<String, String> = dotenv::from_path_iter(file.path())
            .unwrap()
            .map(|item| item.unwrap())
            .collect();
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.cors_origins,
            CorsOrigins::List(vec![
                "http://localhost:5173".into(),
                "https://school.example".into()
            ])
        );
    }
}
