use std::sync::Arc;

use crate::config::{ConfigError, ShipperConfig};
use crate::sink::LogSink;

/// Error type returned when building the collector sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("http feature is not enabled")]
    HttpFeatureDisabled,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Create the HTTP [`LogSink`] described by a [`ShipperConfig`].
///
/// Validates the config and resolves the API key; any failure is returned
/// so the caller can log it once and fall back to an inert pipeline.
pub fn make_sink_from_config(config: &ShipperConfig) -> Result<Arc<dyn LogSink>, BackendBuildError> {
    config.validate()?;

    #[cfg(feature = "http")]
    {
        use crate::http::{HttpSink, HttpSinkConfig};

        let sink = HttpSink::new(HttpSinkConfig {
            endpoint: config.endpoint.clone().unwrap_or_default().trim().to_string(),
            api_key: config.resolve_api_key(),
            timeout: config.request_timeout(),
        })
        .map_err(|e| BackendBuildError::Client(e.to_string()))?;

        Ok(Arc::new(sink) as Arc<dyn LogSink>)
    }

    #[cfg(not(feature = "http"))]
    {
        Err(BackendBuildError::HttpFeatureDisabled)
    }
}
