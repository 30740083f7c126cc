//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_API_BASE_URL` - Catalog/auth REST API base URL
//!   (default: `https://api.escuelajs.co/api/v1`)
//! - `STOREFRONT_CATALOG_CACHE_TTL_SECS` - Product listing cache TTL (default: 300)
//! - `STOREFRONT_STORAGE_PATH` - Durable session storage file
//!   (default: `.shopfront/storage.json`)
//! - `STOREFRONT_CHECKOUT_DELAY_MS` - Simulated payment delay (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default remote API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.escuelajs.co/api/v1";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_STORAGE_PATH: &str = ".shopfront/storage.json";
const DEFAULT_CHECKOUT_DELAY_MS: u64 = 3000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Remote catalog/auth API configuration
    pub api: ApiConfig,
    /// File holding the durable session entries
    pub storage_path: PathBuf,
    /// How long the simulated payment takes before the cart is cleared
    pub checkout_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote catalog/auth API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; endpoint paths are appended to it
    pub base_url: String,
    /// How long a fetched product listing is reused
    pub cache_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            api: ApiConfig::default(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            checkout_delay: Duration::from_millis(DEFAULT_CHECKOUT_DELAY_MS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = parse_or(&lookup, "STOREFRONT_HOST", defaults.host)?;
        let port = parse_or(&lookup, "STOREFRONT_PORT", defaults.port)?;

        let base_url = lookup("STOREFRONT_API_BASE_URL")
            .unwrap_or(defaults.api.base_url);
        validate_base_url(&base_url, "STOREFRONT_API_BASE_URL")?;

        let cache_ttl = Duration::from_secs(parse_or(
            &lookup,
            "STOREFRONT_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);
        let checkout_delay = Duration::from_millis(parse_or(
            &lookup,
            "STOREFRONT_CHECKOUT_DELAY_MS",
            DEFAULT_CHECKOUT_DELAY_MS,
        )?);

        let storage_path = lookup("STOREFRONT_STORAGE_PATH")
            .map_or(defaults.storage_path, PathBuf::from);

        Ok(Self {
            host,
            port,
            api: ApiConfig {
                base_url,
                cache_ttl,
            },
            storage_path,
            checkout_delay,
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|v| !v.is_empty()),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable if set, otherwise use `default`.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Require an absolute http(s) URL.
fn validate_base_url(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}
