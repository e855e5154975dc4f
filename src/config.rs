//! Application configuration loaded from environment variables.
//!
//! Everything except the JWT signing key has a sensible default so a local
//! instance starts with only `JWT_SIGNING_KEY` set.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Assumptions used for usage-based charges when a configuration gives no hint.
#[derive(Debug, Clone)]
pub struct UsageDefaults {
    /// Hours billed per month for always-on resources
    pub hours_per_month: f64,
    /// Assumed stored GB for each S3 bucket
    pub s3_storage_gb: f64,
    /// Assumed monthly invocations for each Lambda function
    pub lambda_monthly_requests: f64,
}

impl Default for UsageDefaults {
    fn default() -> Self {
        Self {
            hours_per_month: 730.0,
            s3_storage_gb: 100.0,
            lambda_monthly_requests: 1_000_000.0,
        }
    }
}

/// Per-client request budgets.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Window the budgets below refill over
    pub window: Duration,
    /// Requests per window for the API as a whole
    pub api_max_requests: u32,
    /// Failed attempts per window on login and register
    pub auth_max_attempts: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            api_max_requests: 100,
            auth_max_attempts: 10,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Region used when a request does not name one
    pub default_region: String,
    /// Optional remote pricing endpoint; catalog-only when unset
    pub pricing_api_url: Option<String>,
    /// How long a looked-up price stays cached
    pub price_cache_ttl: Duration,
    /// Upper bound on cached prices
    pub price_cache_max_entries: usize,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,
    pub usage: UsageDefaults,
    pub rate_limit: RateLimitSettings,

    // --- Secrets ---
    /// JWT signing key for access tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            default_region: "us-east-1".to_string(),
            pricing_api_url: None,
            price_cache_ttl: Duration::from_secs(86_400),
            price_cache_max_entries: 10_000,
            access_token_ttl: Duration::from_secs(900),
            refresh_token_ttl_days: 7,
            usage: UsageDefaults::default(),
            rate_limit: RateLimitSettings::default(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = UsageDefaults::default();
        let limits = RateLimitSettings::default();

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            default_region: env::var("DEFAULT_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            pricing_api_url: env::var("PRICING_API_URL")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            price_cache_ttl: Duration::from_secs(parse_var("PRICE_CACHE_TTL_SECS", 86_400)?),
            price_cache_max_entries: parse_var("PRICE_CACHE_MAX_ENTRIES", 10_000)?,
            access_token_ttl: Duration::from_secs(parse_var("ACCESS_TOKEN_TTL_SECS", 900)?),
            refresh_token_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS", 7)?,
            usage: UsageDefaults {
                hours_per_month: parse_positive("HOURS_PER_MONTH", defaults.hours_per_month)?,
                s3_storage_gb: parse_var("DEFAULT_S3_STORAGE_GB", defaults.s3_storage_gb)?,
                lambda_monthly_requests: parse_var(
                    "DEFAULT_LAMBDA_REQUESTS",
                    defaults.lambda_monthly_requests,
                )?,
            },
            rate_limit: RateLimitSettings {
                window: Duration::from_secs(parse_var(
                    "RATE_LIMIT_WINDOW_SECS",
                    limits.window.as_secs(),
                )?),
                api_max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS", limits.api_max_requests)?,
                auth_max_attempts: parse_var("AUTH_RATE_LIMIT_MAX", limits.auth_max_attempts)?,
            },

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Like `parse_var`, but the value must be finite and greater than zero.
fn parse_positive(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = parse_var(name, default)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(name))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
