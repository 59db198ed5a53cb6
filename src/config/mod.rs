//! Environment-driven client defaults.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::auth::TokenStoreConfig;

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<ClientConfig> = OnceLock::new();

/// Fallback API base URL when `APATIE_API_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
/// Fallback per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Fallback language preference for `Accept-Language`.
pub const DEFAULT_LANGUAGE: &str = "fa-IR";

/// Defaults applied to [`ApiClientOptions`](crate::client::ApiClientOptions)
/// fields the caller leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub language: String,
    pub token_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            language: DEFAULT_LANGUAGE.to_string(),
            token_dir: TokenStoreConfig::default_dir(),
        }
    }
}

impl ClientConfig {
    /// Load from environment variables, reading `.env` if present.
    ///
    /// - `APATIE_API_BASE_URL`
    /// - `APATIE_API_TIMEOUT_MS`
    /// - `APATIE_LANGUAGE`
    /// - `APATIE_TOKEN_DIR`
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty or invalid values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            base_url: non_empty("APATIE_API_BASE_URL").unwrap_or(defaults.base_url),
            timeout: non_empty("APATIE_API_TIMEOUT_MS")
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            language: non_empty("APATIE_LANGUAGE").unwrap_or(defaults.language),
            token_dir: non_empty("APATIE_TOKEN_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_dir),
        }
    }

    /// Get (or create) the global default config.
    pub fn global() -> &'static ClientConfig {
        DEFAULT_CONFIG.get_or_init(Self::from_env)
    }
}
