//! Middleware configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BIGCOMMERCE_API_CLIENT_ID` - API account client id
//! - `BIGCOMMERCE_API_CLIENT_SECRET` - API account client secret
//! - `BIGCOMMERCE_API_ACCESS_TOKEN` - API account access token
//! - `BIGCOMMERCE_STORE_ID` - Store hash (e.g., `abc123xyz`)
//!
//! ## Optional
//! - `BIGCOMMERCE_API_URL` - API base URL (default: <https://api.bigcommerce.com>)
//! - `GRAPHQL_MAX_RETRY` - Transport retries for storefront GraphQL calls (default: 3)
//! - `JWT_TOKEN_EXPIRATION_DAYS` - Lifetime of impersonation tokens (default: 2)
//! - `MIDDLEWARE_HOST` - Bind address (default: 0.0.0.0)
//! - `MIDDLEWARE_PORT` - Listen port (default: 8181)
//! - `MIDDLEWARE_CACHE_TTL` - Response cache TTL in seconds (default: 86400)
//! - `MIDDLEWARE_ALLOWED_ORIGINS` - Comma-separated extra CORS origins
//! - `DEFAULT_CHANNEL_ID` - Channel used when no header/host matches (default: 1)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use reef_core::{ChannelId, Storefront, Storefronts};
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Browser origin that is always allowed to call the proxy, so a local
/// frontend works without any CORS configuration.
pub const LOCAL_DEV_ORIGIN: &str = "http://localhost:3000";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Middleware application configuration.
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Browser origins allowed to call the proxy (always includes
    /// [`LOCAL_DEV_ORIGIN`])
    pub allowed_origins: Vec<String>,
    /// Time-to-live for cached upstream responses
    pub cache_ttl: Duration,
    /// BigCommerce API configuration
    pub bigcommerce: BigcommerceConfig,
    /// Host → channel table for multi-storefront resolution
    pub storefronts: Storefronts,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// BigCommerce API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BigcommerceConfig {
    /// API base URL (no trailing slash)
    pub api_url: String,
    /// API account client id (sent as `X-Auth-Client`)
    pub client_id: String,
    /// API account client secret (kept for webhook/JWT validation parity;
    /// not sent on requests)
    pub client_secret: SecretString,
    /// API account access token (sent as `X-Auth-Token`)
    pub access_token: SecretString,
    /// Store hash identifying the store in API paths
    pub store_hash: String,
    /// Transport retries for storefront GraphQL calls
    pub graphql_max_retry: u32,
    /// Lifetime of customer-impersonation tokens in days
    pub jwt_token_expiration_days: i64,
}

impl std::fmt::Debug for BigcommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigcommerceConfig")
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("store_hash", &self.store_hash)
            .field("graphql_max_retry", &self.graphql_max_retry)
            .field("jwt_token_expiration_days", &self.jwt_token_expiration_days)
            .finish()
    }
}

impl MiddlewareConfig {
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

        let host = get_env_or_default("MIDDLEWARE_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MIDDLEWARE_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("MIDDLEWARE_PORT", "8181")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MIDDLEWARE_PORT".to_string(), e.to_string())
            })?;
        let cache_ttl = get_env_or_default("MIDDLEWARE_CACHE_TTL", "86400")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MIDDLEWARE_CACHE_TTL".to_string(), e.to_string())
            })?;
        let allowed_origins = parse_allowed_origins(get_optional_env("MIDDLEWARE_ALLOWED_ORIGINS"));

        let default_channel = get_env_or_default("DEFAULT_CHANNEL_ID", "1")
            .parse::<i32>()
            .map(ChannelId::new)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("DEFAULT_CHANNEL_ID".to_string(), e.to_string())
            })?;

        let bigcommerce = BigcommerceConfig::from_env()?;
        let storefronts = default_storefronts(default_channel);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            allowed_origins,
            cache_ttl,
            bigcommerce,
            storefronts,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BigcommerceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_env_or_default("BIGCOMMERCE_API_URL", "https://api.bigcommerce.com"),
            client_id: get_required_env("BIGCOMMERCE_API_CLIENT_ID")?,
            client_secret: get_validated_secret("BIGCOMMERCE_API_CLIENT_SECRET")?,
            access_token: get_validated_secret("BIGCOMMERCE_API_ACCESS_TOKEN")?,
            store_hash: get_required_env("BIGCOMMERCE_STORE_ID")?,
            graphql_max_retry: get_env_or_default("GRAPHQL_MAX_RETRY", "3")
                .parse::<u32>()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("GRAPHQL_MAX_RETRY".to_string(), e.to_string())
                })?,
            jwt_token_expiration_days: get_env_or_default("JWT_TOKEN_EXPIRATION_DAYS", "2")
                .parse::<i64>()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "JWT_TOKEN_EXPIRATION_DAYS".to_string(),
                        e.to_string(),
                    )
                })?,
        })
    }
}

/// The built-in host → channel table.
///
/// Hosts serving a non-default channel are registered here; anything else
/// falls back to the default channel (or an explicit channel header).
fn default_storefronts(default_channel: ChannelId) -> Storefronts {
    Storefronts {
        default_channel,
        hosts: vec![
            (
                "store1.demo-bc.vuestorefront.io".to_owned(),
                Storefront {
                    name: "Household items".to_owned(),
                    channel_id: ChannelId::new(983_771),
                    protocol: None,
                },
            ),
            (
                "store2.demo-bc.vuestorefront.io".to_owned(),
                Storefront {
                    name: "Garden".to_owned(),
                    channel_id: ChannelId::new(993_626),
                    protocol: None,
                },
            ),
        ],
    }
}

/// Build the CORS allow-list: the fixed local development origin plus any
/// comma-separated extra origins. Blank entries are dropped; entries that do
/// not parse as URLs are dropped with a warning.
fn parse_allowed_origins(extra: Option<String>) -> Vec<String> {
    let mut origins = vec![LOCAL_DEV_ORIGIN.to_string()];

    for entry in extra.as_deref().unwrap_or("").split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if url::Url::parse(entry).is_err() {
            tracing::warn!(origin = %entry, "Ignoring malformed CORS origin");
            continue;
        }
        origins.push(entry.to_string());
    }

    origins
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API credentials have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the credential issued by the store control panel."
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
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-access-token-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string, like a real access token
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_allowed_origins_default_only() {
        let origins = parse_allowed_origins(None);
        assert_eq!(origins, vec![LOCAL_DEV_ORIGIN.to_string()]);
    }

    #[test]
    fn test_parse_allowed_origins_extra() {
        let origins = parse_allowed_origins(Some(
            "https://store1.demo-bc.vuestorefront.io, https://store2.demo-bc.vuestorefront.io"
                .to_string(),
        ));
        assert_eq!(origins.len(), 3);
        assert_eq!(origins[1], "https://store1.demo-bc.vuestorefront.io");
    }

    #[test]
    fn test_parse_allowed_origins_drops_malformed() {
        let origins = parse_allowed_origins(Some("not a url,,https://ok.example".to_string()));
        assert_eq!(
            origins,
            vec![
                LOCAL_DEV_ORIGIN.to_string(),
                "https://ok.example".to_string()
            ]
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = MiddlewareConfig {
            host: "0.0.0.0".parse().unwrap(),
            port: 8181,
            allowed_origins: vec![LOCAL_DEV_ORIGIN.to_string()],
            cache_ttl: Duration::from_secs(86_400),
            bigcommerce: BigcommerceConfig {
                api_url: "https://api.bigcommerce.com".to_string(),
                client_id: "client_id".to_string(),
                client_secret: SecretString::from("client_secret_value"),
                access_token: SecretString::from("access_token_value"),
                store_hash: "abc123xyz".to_string(),
                graphql_max_retry: 3,
                jwt_token_expiration_days: 2,
            },
            storefronts: Storefronts::with_default(ChannelId::new(1)),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 8181);
    }

    #[test]
    fn test_bigcommerce_config_debug_redacts_secrets() {
        let config = BigcommerceConfig {
            api_url: "https://api.bigcommerce.com".to_string(),
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
            access_token: SecretString::from("super_secret_access_token"),
            store_hash: "abc123xyz".to_string(),
            graphql_max_retry: 3,
            jwt_token_expiration_days: 2,
        };

        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("abc123xyz"));
        assert!(debug_output.contains("client_id_value"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
        assert!(!debug_output.contains("super_secret_access_token"));
    }
}
