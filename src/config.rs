use std::env;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
}

/// Where the evaluation store lives and how the pool talks to it.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

#[derive(Clone)]
pub enum DatabaseTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
    },
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::Url(_) => f.write_str("Url(<redacted>)"),
            DatabaseTarget::Parts {
                host,
                port,
                database,
                user,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("set DATABASE_URL or all of DB_HOST, DB_NAME, DB_USER and DB_PASS (missing {0})")]
    MissingDatabase(&'static str),

    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("DATABASE_URL is not a valid Postgres connection string")]
    InvalidUrl,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let target = match value("DATABASE_URL") {
            Some(url) => DatabaseTarget::Url(url),
            None => {
                let required = |key: &'static str| value(key).ok_or(ConfigError::MissingDatabase(key));
                DatabaseTarget::Parts {
                    host: required("DB_HOST")?,
                    port: number(&value, "DB_PORT", DEFAULT_PORT)?,
                    database: required("DB_NAME")?,
                    user: required("DB_USER")?,
                    password: required("DB_PASS")?,
                }
            }
        };

        let database = DatabaseConfig {
            target,
            max_connections: number(&value, "RADAR_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            acquire_timeout: Duration::from_secs(number(
                &value,
                "RADAR_DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?),
            statement_timeout: Duration::from_secs(number(
                &value,
                "RADAR_DB_STATEMENT_TIMEOUT_SECS",
                DEFAULT_STATEMENT_TIMEOUT_SECS,
            )?),
        };

        let log_level = value("RADAR_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn number<T, F>(value: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    F: Fn(&str) -> Option<String>,
{
    match value(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(ConfigError::InvalidNumber { key, value: raw }),
        },
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let options = match &self.target {
            DatabaseTarget::Url(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|_| ConfigError::InvalidUrl)?,
            DatabaseTarget::Parts {
                host,
                port,
                database,
                user,
                password,
            } => PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(database)
                .username(user)
                .password(password),
        };

        let timeout_ms = self.statement_timeout.as_millis().to_string();
        Ok(options
            .application_name("contract-radar")
            .options([("statement_timeout", timeout_ms)]))
    }
}
