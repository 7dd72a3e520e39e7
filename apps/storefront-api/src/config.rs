//! Storefront API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable | Default |
//! |---|---|
//! | `HTTP_PORT` | `8080` |
//! | `DATABASE_PATH` | `./storefront.db` |
//! | `DB_MAX_CONNECTIONS` | `5` |
//! | `ASSET_BASE_URL` | `http://localhost:8080/assets` |
//! | `ASSET_SIGNING_SECRET` | required, at least 32 bytes |
//! | `DOWNLOAD_URL_TTL_SECS` | `300`, at most one day |
//! | `GIFT_CARD_DENOMINATIONS` | `2500,5000,7500,10000` |
//! | `ADMIN_TOKENS` | empty (admin routes refuse everything) |
//! | `GIFT_CARD_WEBHOOK_URL` | unset (notifications are only logged) |

use std::env;

use storefront_core::Denominations;

/// Minimum accepted length of the asset signing secret.
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Longest lifetime of a signed download URL (one day).
pub const MAX_DOWNLOAD_URL_TTL_SECS: i64 = 86_400;

/// Storefront API configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Public base URL signed download links point at
    pub asset_base_url: String,

    /// HMAC key for download links
    pub asset_signing_secret: Vec<u8>,

    /// Lifetime of a signed download link in seconds
    pub download_url_ttl_secs: i64,

    /// Amounts a gift card may be issued for
    pub denominations: Denominations,

    /// Opaque bearer tokens accepted on admin routes
    pub admin_tokens: Vec<String>,

    /// Where gift card notifications are POSTed, if anywhere
    pub gift_card_webhook_url: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("http_port", &self.http_port)
            .field("database_path", &self.database_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("asset_base_url", &self.asset_base_url)
            .field("asset_signing_secret", &"[REDACTED]")
            .field("download_url_ttl_secs", &self.download_url_ttl_secs)
            .field("denominations", &self.denominations)
            .field("admin_tokens", &self.admin_tokens.len())
            .field("gift_card_webhook_url", &self.gift_card_webhook_url)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let secret = lookup("ASSET_SIGNING_SECRET")
            .ok_or_else(|| ConfigError::MissingRequired("ASSET_SIGNING_SECRET".to_string()))?;
        if secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SIGNING_SECRET_LEN,
            });
        }

        let denominations = parse_cents_list(&var("GIFT_CARD_DENOMINATIONS", "2500,5000,7500,10000"))
            .and_then(|cents| Denominations::new(cents).ok())
            .ok_or_else(|| ConfigError::InvalidValue("GIFT_CARD_DENOMINATIONS".to_string()))?;

        let config = ApiConfig {
            http_port: var("HTTP_PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: var("DATABASE_PATH", "./storefront.db"),

            db_max_connections: var("DB_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,

            asset_base_url: var("ASSET_BASE_URL", "http://localhost:8080/assets")
                .trim_end_matches('/')
                .to_string(),

            asset_signing_secret: secret.into_bytes(),

            download_url_ttl_secs: var("DOWNLOAD_URL_TTL_SECS", "300")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DOWNLOAD_URL_TTL_SECS".to_string()))?,

            denominations,

            admin_tokens: var("ADMIN_TOKENS", "")
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),

            gift_card_webhook_url: lookup("GIFT_CARD_WEBHOOK_URL").filter(|u| !u.trim().is_empty()),
        };

        if !(1..=MAX_DOWNLOAD_URL_TTL_SECS).contains(&config.download_url_ttl_secs) {
            return Err(ConfigError::InvalidValue("DOWNLOAD_URL_TTL_SECS".to_string()));
        }
        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }
}

fn parse_cents_list(raw: &str) -> Option<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("ASSET_SIGNING_SECRET must be at least {min} bytes")]
    SecretTooShort { min: usize },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
