//! Application configuration loaded from environment variables.
//!
//! - `HOST` bind address (default `0.0.0.0`)
//! - `PORT` listen port (default `3000`)
//! - `RUST_LOG` tracing filter directive (default `info`)
//! - `LOG_FORMAT` `json` for JSON log lines, anything else for plain text
//! - `DATABASE_URL` PostgreSQL connection string; in-memory storage when unset
//! - `SESSION_TTL_HOURS` bearer token lifetime (default 168)
//! - `ALLOWED_ORIGINS` comma-separated CORS origins; any origin when unset
//! - `MIDTRANS_SERVER_KEY`, `MIDTRANS_CLIENT_KEY`, `MIDTRANS_IS_PRODUCTION`
//! - `GOOGLE_MAPS_API_KEY`
//! - `ADMIN_NAME`, `ADMIN_EMAIL`, `ADMIN_PASSWORD` administrator to bootstrap

use domain::DEFAULT_SESSION_TTL_HOURS;
use gateways::MidtransConfig;
use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Administrator account created or promoted at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<SecretString>,
    pub session_ttl_hours: i64,
    pub allowed_origins: Vec<String>,
    pub midtrans: Option<MidtransConfig>,
    pub google_maps_api_key: Option<SecretString>,
    pub admin: Option<AdminBootstrap>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| ConfigError::InvalidEnvVar("PORT", format!("{e}")))?,
            None => 3000,
        };

        let session_ttl_hours = match get("SESSION_TTL_HOURS") {
            Some(h) => match h.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::InvalidEnvVar(
                        "SESSION_TTL_HOURS",
                        "must be a positive number of hours".to_string(),
                    ));
                }
            },
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let midtrans = match get("MIDTRANS_SERVER_KEY") {
            Some(key) => Some(MidtransConfig {
                server_key: SecretString::from(key),
                client_key: get("MIDTRANS_CLIENT_KEY"),
                is_production: parse_bool("MIDTRANS_IS_PRODUCTION", get("MIDTRANS_IS_PRODUCTION"))?,
            }),
            None => None,
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                name: get("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password: SecretString::from(password),
            }),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("ADMIN_EMAIL")),
            (None, None) => None,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format,
            database_url: get("DATABASE_URL").map(SecretString::from),
            session_ttl_hours,
            allowed_origins,
            midtrans,
            google_maps_api_key: get("GOOGLE_MAPS_API_KEY").map(SecretString::from),
            admin,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref() {
        None => Ok(false),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            name,
            format!("expected true or false, got {other}"),
        )),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            allowed_origins: Vec::new(),
            midtrans: None,
            google_maps_api_key: None,
            admin: None,
        }
    }
}
