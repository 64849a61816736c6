use crate::env::*;
use crate::level::LogLevel;
use parking_lot::RwLock;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-API-KEY";

static API_KEY_OVERRIDE: RwLock<Option<String>> = parking_lot::const_rwlock(None);

/// Set a process-wide API key consulted when the config carries none.
///
/// Sits between the explicit config value and the `LOGHUB_API_KEY`
/// environment variable in resolution order. `None` clears it.
pub fn set_api_key_override(key: Option<String>) {
    *API_KEY_OVERRIDE.write() = key.filter(|k| !k.trim().is_empty());
}

/// Origin of the resolved API key. Logged when a pipeline starts, never
/// the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Config,
    Override,
    Environment,
    Missing,
}

/// Errors that leave a pipeline inert instead of shipping.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("LogHub endpoint is required but not configured")]
    MissingEndpoint,

    #[error("LogHub endpoint must be an http(s) URL, got {0:?}")]
    InvalidEndpoint(String),

    #[error("LogHub shipping is disabled")]
    Disabled,
}

/// Settings for a [`Pipeline`](crate::pipeline::Pipeline).
///
/// Built once at startup and passed by value into the pipeline; nothing
/// reads it from a global afterwards. Every field has a default so the
/// struct can be deserialized from a partial document.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ShipperConfig {
    pub endpoint: Option<String>,
    pub application: String,
    pub environment: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub queue_capacity: usize,
    pub worker_threads: usize,
    pub minimum_level: LogLevel,
    pub enabled: bool,
    pub mask_sensitive_data: bool,
    /// Upper bound on concurrent fire-and-forget requests.
    pub max_in_flight: usize,
    /// How long a worker waits on an empty buffer before re-checking for stop.
    pub poll_interval_ms: u64,
    /// How long `shutdown` waits for workers to drain before aborting them.
    pub shutdown_grace_ms: u64,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            application: "unknown".to_string(),
            environment: "unknown".to_string(),
            api_key: None,
            timeout_ms: 5_000,
            queue_capacity: 1_000,
            worker_threads: 1,
            minimum_level: LogLevel::Info,
            enabled: true,
            mask_sensitive_data: true,
            max_in_flight: 64,
            poll_interval_ms: 100,
            shutdown_grace_ms: 2_000,
        }
    }
}

impl ShipperConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Build a config from `LOGHUB_*` environment variables, falling back
    /// to defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_non_blank(LOGHUB_ENDPOINT_ENV),
            application: env_or(LOGHUB_APPLICATION_ENV, &defaults.application),
            environment: env_or(LOGHUB_ENVIRONMENT_ENV, &defaults.environment),
            // the env key is picked up by `resolve_api_key` as a fallback
            api_key: None,
            timeout_ms: env_parse(LOGHUB_TIMEOUT_MS_ENV).unwrap_or(defaults.timeout_ms),
            queue_capacity: env_parse(LOGHUB_QUEUE_CAPACITY_ENV).unwrap_or(defaults.queue_capacity),
            worker_threads: env_parse(LOGHUB_WORKER_THREADS_ENV).unwrap_or(defaults.worker_threads),
            minimum_level: env_parse(LOGHUB_MINIMUM_LEVEL_ENV).unwrap_or(defaults.minimum_level),
            enabled: env_parse(LOGHUB_ENABLED_ENV).unwrap_or(defaults.enabled),
            mask_sensitive_data: env_parse(LOGHUB_MASK_SENSITIVE_DATA_ENV)
                .unwrap_or(defaults.mask_sensitive_data),
            ..defaults
        }
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_minimum_level(mut self, level: LogLevel) -> Self {
        self.minimum_level = level;
        self
    }

    /// Check that the config can drive a live pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Err(ConfigError::Disabled);
        }
        let endpoint = match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => return Err(ConfigError::MissingEndpoint),
        };
        let lower = endpoint.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(())
    }

    /// Resolve the API key: explicit config value, then the process-wide
    /// override, then the `LOGHUB_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with_source().0
    }

    /// Where [`resolve_api_key`](Self::resolve_api_key) finds the key.
    pub fn api_key_source(&self) -> ApiKeySource {
        self.resolve_api_key_with_source().1
    }

    fn resolve_api_key_with_source(&self) -> (Option<String>, ApiKeySource) {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return (Some(key.clone()), ApiKeySource::Config);
        }
        if let Some(key) = API_KEY_OVERRIDE.read().clone() {
            return (Some(key), ApiKeySource::Override);
        }
        if let Some(key) = env_non_blank(LOGHUB_API_KEY_ENV) {
            return (Some(key), ApiKeySource::Environment);
        }
        (None, ApiKeySource::Missing)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.max(1)
    }

    pub fn effective_max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }
}

/// Show at most the first four characters of a key.
pub fn mask_api_key(key: Option<&str>) -> String {
    match key {
        Some(key) if key.chars().count() > 4 => {
            let prefix: String = key.chars().take(4).collect();
            format!("{prefix}****")
        }
        _ => "****".to_string(),
    }
}

impl fmt::Debug for ShipperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShipperConfig")
            .field("endpoint", &self.endpoint)
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("api_key", &mask_api_key(self.api_key.as_deref()))
            .field("timeout_ms", &self.timeout_ms)
            .field("queue_capacity", &self.queue_capacity)
            .field("worker_threads", &self.worker_threads)
            .field("minimum_level", &self.minimum_level)
            .field("enabled", &self.enabled)
            .field("mask_sensitive_data", &self.mask_sensitive_data)
            .field("max_in_flight", &self.max_in_flight)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("shutdown_grace_ms", &self.shutdown_grace_ms)
            .finish()
    }
}
