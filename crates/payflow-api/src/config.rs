//! Process configuration read from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use payflow_payments::application::command_handlers::Deadlines;

use crate::error::AppError;

/// Connection pool settings for `PostgreSQL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection string.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Connections kept open when idle.
    pub min_connections: u32,
    /// Maximum age of a pooled connection.
    pub max_lifetime: Duration,
    /// Idle time after which a connection is closed.
    pub idle_timeout: Duration,
    /// Apply pending migrations at startup.
    pub run_migrations: bool,
}

/// Redis settings for the idempotency cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Connection string.
    pub url: String,
    /// Prefix applied to every cache key.
    pub namespace: String,
}

/// HTTP server limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Bound on receiving a request body.
    pub read_timeout: Duration,
    /// Bound on handling a request end to end. Expiry answers `408`.
    pub request_timeout: Duration,
    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(15),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Deployment environment name.
    pub environment: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Server timeouts.
    pub http: HttpConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Cache settings.
    pub redis: RedisConfig,
    /// Per-call cache deadline.
    pub cache_timeout: Duration,
    /// Per-call store deadline.
    pub store_timeout: Duration,
    /// OTLP collector endpoint. Export is disabled when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns the value of a
    /// variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".into()))?;

        Ok(Self {
            environment: var("APP_ENV", "development"),
            host: var("HOST", "0.0.0.0"),
            port: parse("PORT", &var("PORT", "3000"))?,
            http: HttpConfig {
                read_timeout: Duration::from_secs(parse(
                    "HTTP_READ_TIMEOUT_SECS",
                    &var("HTTP_READ_TIMEOUT_SECS", "10"),
                )?),
                request_timeout: Duration::from_secs(parse(
                    "HTTP_REQUEST_TIMEOUT_SECS",
                    &var("HTTP_REQUEST_TIMEOUT_SECS", "30"),
                )?),
                shutdown_timeout: Duration::from_secs(parse(
                    "HTTP_SHUTDOWN_TIMEOUT_SECS",
                    &var("HTTP_SHUTDOWN_TIMEOUT_SECS", "15"),
                )?),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse("DATABASE_MAX_CONNS", &var("DATABASE_MAX_CONNS", "20"))?,
                min_connections: parse("DATABASE_MIN_CONNS", &var("DATABASE_MIN_CONNS", "5"))?,
                max_lifetime: Duration::from_secs(parse(
                    "DATABASE_MAX_CONN_LIFETIME_SECS",
                    &var("DATABASE_MAX_CONN_LIFETIME_SECS", "3600"),
                )?),
                idle_timeout: Duration::from_secs(parse(
                    "DATABASE_MAX_CONN_IDLE_SECS",
                    &var("DATABASE_MAX_CONN_IDLE_SECS", "1800"),
                )?),
                run_migrations: parse(
                    "DATABASE_RUN_MIGRATIONS",
                    &var("DATABASE_RUN_MIGRATIONS", "true"),
                )?,
            },
            redis: RedisConfig {
                url: var("REDIS_URL", "redis://127.0.0.1:6379"),
                namespace: var("REDIS_NAMESPACE", "payment-service"),
            },
            cache_timeout: Duration::from_millis(parse(
                "CACHE_TIMEOUT_MS",
                &var("CACHE_TIMEOUT_MS", "500"),
            )?),
            store_timeout: Duration::from_millis(parse(
                "STORE_TIMEOUT_MS",
                &var("STORE_TIMEOUT_MS", "5000"),
            )?),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
        })
    }

    /// Whether logs should be emitted as JSON.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Deadlines applied to cache and store calls.
    #[must_use]
    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            cache: self.cache_timeout,
            store: self.store_timeout,
        }
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{name} is invalid ({value:?}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        // Act
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/payflow")]).unwrap();

        // Assert
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 5);
        assert_eq!(config.database.max_lifetime, Duration::from_secs(3600));
        assert_eq!(config.database.idle_timeout, Duration::from_secs(1800));
        assert!(config.database.run_migrations);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.redis.namespace, "payment-service");
        assert_eq!(config.deadlines(), Deadlines::default());
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_overrides_are_read() {
        let config = config_from(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/payflow"),
            ("PORT", "8080"),
            ("DATABASE_RUN_MIGRATIONS", "false"),
            ("REDIS_NAMESPACE", "payments-eu"),
            ("CACHE_TIMEOUT_MS", "50"),
            ("HTTP_REQUEST_TIMEOUT_SECS", "5"),
            ("HTTP_SHUTDOWN_TIMEOUT_SECS", "2"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
        ])
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.port, 8080);
        assert!(!config.database.run_migrations);
        assert_eq!(config.redis.namespace, "payments-eu");
        assert_eq!(config.cache_timeout, Duration::from_millis(50));
        assert_eq!(config.http.request_timeout, Duration::from_secs(5));
        assert_eq!(config.http.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(config.http.read_timeout, Duration::from_secs(10));
        assert_eq!(
            config.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let result = config_from(&[("PORT", "3000")]);

        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("DATABASE_URL")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/payflow"),
            ("STORE_TIMEOUT_MS", "soon"),
        ]);

        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("STORE_TIMEOUT_MS")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_ip_host_is_rejected_at_bind() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/payflow"),
            ("HOST", "not a host"),
        ])
        .unwrap();

        assert!(matches!(config.bind_addr(), Err(AppError::Config(_))));
    }
}
