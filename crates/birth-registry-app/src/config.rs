//! Startup configuration resolved from the environment.

use std::path::PathBuf;
use std::time::Duration;

use birth_registry_gateway::validate_base_url;
use tracing::warn;
use url::Url;

use crate::AppError;

/// API base URL variable.
pub const API_URL_ENV: &str = "BIRTH_REGISTRY_API_URL";
/// Directory holding the persisted token.
pub const STATE_DIR_ENV: &str = "BIRTH_REGISTRY_STATE_DIR";
/// Record poll interval in whole seconds.
pub const POLL_INTERVAL_ENV: &str = "BIRTH_REGISTRY_POLL_INTERVAL_SECS";

/// Local-development API fallback.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";
/// Default token state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".birth-registry";
/// Default record poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Per-request timeout for the HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend API base URL.
    pub api_base_url: Url,
    /// Token state directory.
    pub state_dir: PathBuf,
    /// Record list refresh interval.
    pub poll_interval: Duration,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, applying fallbacks for
    /// unset or blank values.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an invalid API URL or a poll
    /// interval that is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let value = |key: &str| lookup(key).filter(|raw| !raw.trim().is_empty());

        let raw_url = value(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = validate_base_url(&raw_url)
            .map_err(|error| AppError::Config(format!("{API_URL_ENV}: {error}")))?;
        if !is_https_endpoint(api_base_url.as_str()) && !is_loopback(&api_base_url) {
            warn!(api = %api_base_url, "api url is not https; tokens will travel in clear text");
        }

        let state_dir = value(STATE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        let poll_interval = match value(POLL_INTERVAL_ENV) {
            None => DEFAULT_POLL_INTERVAL,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(seconds) if seconds > 0 => Duration::from_secs(seconds),
                _ => {
                    return Err(AppError::Config(format!(
                        "{POLL_INTERVAL_ENV} must be a positive integer, got {raw:?}"
                    )));
                }
            },
        };

        Ok(Self {
            api_base_url,
            state_dir,
            poll_interval,
        })
    }
}

/// Returns `true` when endpoint URL is HTTPS.
pub fn is_https_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}
