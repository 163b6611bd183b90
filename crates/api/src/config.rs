//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREHOUSE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `STOREHOUSE_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREHOUSE_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREHOUSE_PORT` - Listen port (default: 8000)
//! - `STOREHOUSE_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 168)
//! - `STOREHOUSE_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `STOREHOUSE_ENV` - `development` or `production` (default: development)
//! - `STOREHOUSE_UTC_OFFSET_MINUTES` - Store-local offset for dashboard days (default: 0)
//! - `PINCODE_API_URL` - Postal-code lookup service (default: <https://api.postalpincode.in>)
//! - `MEDIA_UPLOAD_URL` / `MEDIA_UPLOAD_TOKEN` - External media host for product images
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use chrono::FixedOffset;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// External media host used for product image uploads.
///
/// Implements `Debug` manually to redact the upload token.
#[derive(Clone)]
pub struct MediaConfig {
    /// Endpoint accepting `multipart/form-data` uploads
    pub upload_url: Url,
    /// Bearer token for the media host
    pub token: SecretString,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("upload_url", &self.upload_url.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing secret
    pub token_secret: SecretString,
    /// Bearer token lifetime in hours
    pub token_ttl_hours: i64,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Deployment environment
    pub environment: Environment,
    /// Offset that defines the store's local day
    pub utc_offset: FixedOffset,
    /// Postal-code lookup service base URL
    pub pincode_api_url: Url,
    /// Media host, if configured
    pub media: Option<MediaConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
    /// Emit JSON logs
    pub log_json: bool,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREHOUSE_DATABASE_URL")?;
        let host = parse_env("STOREHOUSE_HOST", "127.0.0.1")?;
        let port = parse_env("STOREHOUSE_PORT", "8000")?;
        let token_secret = get_validated_secret("STOREHOUSE_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "STOREHOUSE_TOKEN_SECRET")?;
        let token_ttl_hours: i64 = parse_env("STOREHOUSE_TOKEN_TTL_HOURS", "168")?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREHOUSE_TOKEN_TTL_HOURS".to_owned(),
                "must be positive".to_owned(),
            ));
        }

        let cors_origins = get_optional_env("STOREHOUSE_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let environment = match get_env_or_default("STOREHOUSE_ENV", "development").as_str() {
            "production" => Environment::Production,
            "development" => Environment::Development,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREHOUSE_ENV".to_owned(),
                    format!("unknown environment '{other}'"),
                ));
            }
        };

        let offset_minutes: i32 = parse_env("STOREHOUSE_UTC_OFFSET_MINUTES", "0")?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "STOREHOUSE_UTC_OFFSET_MINUTES".to_owned(),
                    "offset out of range".to_owned(),
                )
            })?;

        let pincode_api_url = parse_env("PINCODE_API_URL", "https://api.postalpincode.in")?;
        let media = MediaConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            token_secret,
            token_ttl_hours,
            cors_origins,
            environment,
            utc_offset,
            pincode_api_url,
            media,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            log_json: get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MediaConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = get_optional_env("MEDIA_UPLOAD_URL") else {
            return Ok(None);
        };
        let upload_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MEDIA_UPLOAD_URL".to_owned(), e.to_string())
        })?;
        let token = get_validated_secret("MEDIA_UPLOAD_TOKEN")?;
        Ok(Some(Self { upload_url, token }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Database URL from `STOREHOUSE_DATABASE_URL` or `DATABASE_URL`, for tools
/// that need the database without the rest of the server configuration.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("STOREHOUSE_DATABASE_URL")
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that the token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("q8#Lw2!vR5@tY7$k") > 3.3);
    }

    #[test]
    fn test_placeholder_secrets_rejected() {
        for candidate in ["your-token-secret-goes-here", "changeme-please-0123456789abcdef"] {
            assert!(matches!(
                validate_secret_strength(candidate, "STOREHOUSE_TOKEN_SECRET"),
                Err(ConfigError::InsecureSecret(_, _))
            ));
        }
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let result = validate_secret_strength(&"ab".repeat(20), "STOREHOUSE_TOKEN_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_strong_secret_accepted() {
        assert!(validate_secret_strength("Zr8#pQ2!xN7@vL4$mK9%tB3^wD6&hF1*", "T").is_ok());
    }

    #[test]
    fn test_short_token_secret_rejected() {
        let secret = SecretString::from("Zr8#pQ2!xN7@");
        assert!(validate_token_secret(&secret, "T").is_err());
        let secret = SecretString::from("k".repeat(32));
        assert!(validate_token_secret(&secret, "T").is_ok());
    }

    #[test]
    fn test_media_config_debug_redacts_token() {
        let media = MediaConfig {
            upload_url: Url::parse("https://media.storehouse.test/upload").unwrap(),
            token: SecretString::from("media-token-value"),
        };
        let debug = format!("{media:?}");
        assert!(debug.contains("media.storehouse.test"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("media-token-value"));
    }
}
