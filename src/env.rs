//! Environment variable names read by [`ShipperConfig::from_env`].
//!
//! These are purely helpers; the pipeline itself only ever sees an
//! explicit [`ShipperConfig`] value.
//!
//! [`ShipperConfig`]: crate::config::ShipperConfig
//! [`ShipperConfig::from_env`]: crate::config::ShipperConfig::from_env

/// Collector URL, e.g. `https://api.loghub.io/api/logs`.
pub const LOGHUB_ENDPOINT_ENV: &str = "LOGHUB_ENDPOINT";

/// Application name stamped on every record.
pub const LOGHUB_APPLICATION_ENV: &str = "LOGHUB_APPLICATION";

/// Environment name (`production`, `staging`, ...).
pub const LOGHUB_ENVIRONMENT_ENV: &str = "LOGHUB_ENVIRONMENT";

/// API key; also the last fallback of API key resolution.
pub const LOGHUB_API_KEY_ENV: &str = "LOGHUB_API_KEY";

/// Request timeout in milliseconds.
pub const LOGHUB_TIMEOUT_MS_ENV: &str = "LOGHUB_TIMEOUT_MS";

/// Buffer capacity in records.
pub const LOGHUB_QUEUE_CAPACITY_ENV: &str = "LOGHUB_QUEUE_CAPACITY";

/// Number of background workers.
pub const LOGHUB_WORKER_THREADS_ENV: &str = "LOGHUB_WORKER_THREADS";

/// Minimum level shipped (`TRACE` .. `ERROR`).
pub const LOGHUB_MINIMUM_LEVEL_ENV: &str = "LOGHUB_MINIMUM_LEVEL";

/// `false` turns the pipeline into a no-op.
pub const LOGHUB_ENABLED_ENV: &str = "LOGHUB_ENABLED";

/// `false` ships messages and metadata without redaction.
pub const LOGHUB_MASK_SENSITIVE_DATA_ENV: &str = "LOGHUB_MASK_SENSITIVE_DATA";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable; missing or unparsable values
/// yield `None`.
pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

/// Read a non-blank environment variable.
pub fn env_non_blank(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
