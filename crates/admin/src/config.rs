//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin console
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC string of the console password
//! - `ITEM_STORE_URL` - Base URL of the item store REST API
//! - `MAIL_ENDPOINT` - HTTP endpoint that sends transactional mail
//! - `MAIL_FROM` - Sender address for outgoing mail
//! - `S3_ENDPOINT` - S3-compatible endpoint (path-style URLs)
//! - `S3_REGION` - Signing region
//! - `S3_BUCKET` - Bucket for uploaded media
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ITEM_STORE_API_KEY` - Bearer token for the item store
//! - `MAIL_API_KEY` - Bearer token for the mail endpoint
//! - `STUDIO_NAME` - Name used in customer emails (default: Atelier)
//! - `NEWSLETTER_SEND_DELAY_MS` - Pause between broadcast emails (default: 1000)
//! - `S3_PREFIX` - Key prefix inside the bucket
//! - `S3_PUBLIC_URL` - Public base URL for objects (default: endpoint/bucket)
//! - `S3_ACCESS_KEY_ID` / `S3_SECRET_ACCESS_KEY` - Credentials; read from the
//!   item store secrets endpoint when absent
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use argon2::PasswordHash;
use atelier_core::mail::MailConfig;
use atelier_core::store::ItemStoreConfig;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin console
    pub base_url: String,
    /// Argon2 hash of the console password
    pub password_hash: SecretString,
    /// Item store connection
    pub item_store: ItemStoreConfig,
    /// Mail endpoint
    pub mail: MailConfig,
    /// Studio name used in customer emails
    pub studio_name: String,
    /// Pause between newsletter emails
    pub newsletter_delay: Duration,
    /// Object storage for media uploads
    pub storage: StorageConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// S3-compatible object storage settings.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Key prefix, without leading or trailing slashes
    pub prefix: Option<String>,
    /// Base URL objects are served from
    pub public_url: String,
    pub credentials: Option<StorageCredentials>,
}

/// Access key pair for object storage.
#[derive(Clone)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("public_url", &self.public_url)
            .field(
                "credentials",
                &self.credentials.as_ref().map(|c| c.access_key_id.as_str()),
            )
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// including a password hash that is not a valid PHC string.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let password_hash = get_required_env("ADMIN_PASSWORD_HASH")?;
        PasswordHash::new(&password_hash).map_err(|e| {
            ConfigError::InvalidEnvVar("ADMIN_PASSWORD_HASH".to_string(), e.to_string())
        })?;

        let newsletter_delay = get_env_or_default("NEWSLETTER_SEND_DELAY_MS", "1000")
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("NEWSLETTER_SEND_DELAY_MS".to_string(), e.to_string())
            })?;

        Ok(Self {
            host,
            port,
            base_url: get_required_url("ADMIN_BASE_URL")?,
            password_hash: SecretString::from(password_hash),
            item_store: ItemStoreConfig::new(
                get_required_url("ITEM_STORE_URL")?,
                get_optional_env("ITEM_STORE_API_KEY").map(SecretString::from),
            ),
            mail: MailConfig {
                endpoint: get_required_url("MAIL_ENDPOINT")?,
                api_key: get_optional_env("MAIL_API_KEY").map(SecretString::from),
                from: get_required_env("MAIL_FROM")?,
            },
            studio_name: get_env_or_default("STUDIO_NAME", "Atelier"),
            newsletter_delay,
            storage: StorageConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the console is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// The configured password hash as a PHC string.
    #[must_use]
    pub fn password_hash(&self) -> &str {
        self.password_hash.expose_secret()
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = get_required_url("S3_ENDPOINT")?;
        let bucket = get_required_env("S3_BUCKET")?;
        let public_url = match get_optional_env("S3_PUBLIC_URL") {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{endpoint}/{bucket}"),
        };

        let credentials = match (
            get_optional_env("S3_ACCESS_KEY_ID"),
            get_optional_env("S3_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret)) => Some(StorageCredentials {
                access_key_id,
                secret_access_key: SecretString::from(secret),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "S3_ACCESS_KEY_ID".to_string(),
                    "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together".to_string(),
                ));
            }
        };

        Ok(Self {
            endpoint,
            region: get_required_env("S3_REGION")?,
            bucket,
            prefix: get_optional_env("S3_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            public_url,
            credentials,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable that must parse as an absolute URL.
fn get_required_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value.trim_end_matches('/').to_string())
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a sample rate in `0.0..=1.0`.
fn get_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_debug_hides_secret() {
        let config = StorageConfig {
            endpoint: "https://s3.example.net".to_string(),
            region: "ap-south-1".to_string(),
            bucket: "atelier".to_string(),
            prefix: Some("media".to_string()),
            public_url: "https://cdn.atelier.test".to_string(),
            credentials: Some(StorageCredentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: SecretString::from("wJalrXUtnFEMI/K7MDENG"),
            }),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("AKIDEXAMPLE"));
        assert!(!debug_output.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_get_rate_default() {
        let rate = get_rate("ATELIER_ADMIN_TEST_UNSET_RATE", 0.25).unwrap();
        assert!((rate - 0.25).abs() < f32::EPSILON);
    }
}
