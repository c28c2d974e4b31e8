use std::time::Duration;

use crate::backoff::BackoffConfig;

/// Backend base URL used when `JOBTRACK_API_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8123";

/// Delay between the end of one status fetch and the start of the next.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ceiling for transport-error backoff.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub backoff: BackoffConfig,
}

/// An environment variable held a value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value '{value}' for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            backoff: BackoffConfig {
                max_delay: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
                ..Default::default()
            },
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `JOBTRACK_API_BASE_URL`         | `http://localhost:8123` |
    /// | `JOBTRACK_POLL_INTERVAL_MS`     | `3000`                  |
    /// | `JOBTRACK_REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `JOBTRACK_TRANSPORT_BACKOFF`    | `false`                 |
    /// | `JOBTRACK_BACKOFF_MAX_MS`       | `30000`                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("JOBTRACK_API_BASE_URL") {
            let url = normalize_base_url(&url);
            // An empty override falls back to the default.
            if !url.is_empty() {
                config.base_url = url;
            }
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "JOBTRACK_POLL_INTERVAL_MS")? {
            if ms == 0 {
                return Err(ConfigError {
                    var: "JOBTRACK_POLL_INTERVAL_MS",
                    value: ms.to_string(),
                    reason: "must be greater than zero".into(),
                });
            }
            config.poll_interval = Duration::from_millis(ms);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "JOBTRACK_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(enabled) = parse_var::<bool>(&lookup, "JOBTRACK_TRANSPORT_BACKOFF")? {
            config.backoff.enabled = enabled;
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "JOBTRACK_BACKOFF_MAX_MS")? {
            config.backoff.max_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Replace the base URL, stripping any trailing slash.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Trim whitespace and trailing slashes from a base URL.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError {
                var,
                value: raw,
                reason: e.to_string(),
            }),
    }
}
