use secrecy::SecretString;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Table queried when `APP_DB_TABLE` is not set.
pub const DEFAULT_APPLICANT_TABLE: &str = "zippy_applicants";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let ttl_secs = parse_secs("APP_CACHE_TTL_SECS", 600)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig::from_env()?,
            cache: CacheConfig {
                ttl: Duration::from_secs(ttl_secs),
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// How long a loaded applicant dataset stays fresh.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
        }
    }
}

/// Backing store settings. Credentials are optional here: a missing secret is
/// reported when the dataset is loaded, not at startup.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connection: Option<DatabaseConnection>,
    pub table: String,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let table = env::var("APP_DB_TABLE").unwrap_or_else(|_| DEFAULT_APPLICANT_TABLE.to_string());
        if !is_plain_identifier(&table) {
            return Err(ConfigError::InvalidTable(table));
        }

        let acquire_timeout = Duration::from_secs(parse_secs("APP_DB_ACQUIRE_TIMEOUT_SECS", 30)?);

        let connection = match non_empty_var("APP_DATABASE_URL") {
            Some(url) => Some(DatabaseConnection::Url(SecretString::from(url))),
            None => ConnectionParts::from_env()?.map(DatabaseConnection::Parts),
        };

        Ok(Self {
            connection,
            table,
            acquire_timeout,
        })
    }
}

/// Either a ready-made connection URL or the individual secrets it is built from.
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Url(SecretString),
    Parts(ConnectionParts),
}

#[derive(Debug, Clone)]
pub struct ConnectionParts {
    pub driver: String,
    pub server: String,
    pub port: Option<u16>,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
}

impl ConnectionParts {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(driver), Some(database)) =
            (non_empty_var("APP_DB_DRIVER"), non_empty_var("APP_DB_NAME"))
        else {
            return Ok(None);
        };

        let port = non_empty_var("APP_DB_PORT")
            .map(|raw| raw.parse::<u16>().map_err(|_| ConfigError::InvalidDatabasePort))
            .transpose()?;

        Ok(Some(Self {
            driver,
            server: non_empty_var("APP_DB_SERVER").unwrap_or_default(),
            port,
            database,
            user: non_empty_var("APP_DB_USER"),
            password: non_empty_var("APP_DB_PASSWORD").map(SecretString::from),
        }))
    }
}

/// `SELECT * FROM <table>` is assembled from configuration, so only bare
/// identifiers (optionally schema-qualified) are accepted.
pub fn is_plain_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_secs(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidDuration { key }),
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDatabasePort,
    InvalidDuration { key: &'static str },
    InvalidTable(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDatabasePort => write!(f, "APP_DB_PORT must be a valid u16"),
            ConfigError::InvalidDuration { key } => {
                write!(f, "{key} must be a whole number of seconds")
            }
            ConfigError::InvalidTable(table) => {
                write!(f, "APP_DB_TABLE '{table}' is not a plain SQL identifier")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDatabasePort
            | ConfigError::InvalidDuration { .. }
            | ConfigError::InvalidTable(_) => None,
        }
    }
}
