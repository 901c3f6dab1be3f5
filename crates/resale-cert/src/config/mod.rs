use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::certificate::DEFAULT_FONT_SIZE;

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
    pub documents: DocumentConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            documents: DocumentConfig::from_env()?,
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

/// Template, manifest, and storage settings for certificate generation.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub template_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
    pub default_timezone: Option<String>,
    pub storage_prefix: String,
    pub cache_capacity: usize,
    /// Point size for generated text appearances.
    pub font_size: f32,
}

impl DocumentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let template_path = env::var("APP_TEMPLATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/resale_certificate.pdf"));
        let manifest_path = non_empty_var("APP_FIELD_MANIFEST").map(PathBuf::from);

        let default_timezone = non_empty_var("APP_DEFAULT_TIMEZONE");
        if let Some(zone) = default_timezone.as_deref() {
            if zone.parse::<chrono_tz::Tz>().is_err() {
                return Err(ConfigError::InvalidTimezone(zone.to_string()));
            }
        }

        let storage_prefix = non_empty_var("APP_STORAGE_PREFIX")
            .unwrap_or_else(|| "resale-certificates".to_string())
            .trim_matches('/')
            .to_string();

        let cache_capacity = env::var("APP_CACHE_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidCacheCapacity)?;

        let font_size = match non_empty_var("APP_FONT_SIZE") {
            Some(raw) => raw
                .parse::<f32>()
                .ok()
                .filter(|size| size.is_finite() && *size > 0.0)
                .ok_or(ConfigError::InvalidFontSize(raw))?,
            None => DEFAULT_FONT_SIZE,
        };

        Ok(Self {
            template_path,
            manifest_path,
            default_timezone,
            storage_prefix,
            cache_capacity,
            font_size,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimezone(String),
    InvalidCacheCapacity,
    InvalidFontSize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimezone(zone) => {
                write!(f, "APP_DEFAULT_TIMEZONE '{zone}' is not a known IANA timezone")
            }
            ConfigError::InvalidCacheCapacity => {
                write!(f, "APP_CACHE_CAPACITY must be a non-negative integer")
            }
            ConfigError::InvalidFontSize(raw) => {
                write!(f, "APP_FONT_SIZE '{raw}' must be a positive number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimezone(_)
            | ConfigError::InvalidCacheCapacity
            | ConfigError::InvalidFontSize(_) => None,
        }
    }
}
