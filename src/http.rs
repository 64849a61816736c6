use crate::config::API_KEY_HEADER;
use crate::record::CanonicalRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Configuration for [`HttpSink`].
#[derive(Clone)]
pub struct HttpSinkConfig {
    /// Full collector URL records are POSTed to.
    pub endpoint: String,
    /// Sent as `X-API-KEY` when present and non-blank.
    pub api_key: Option<String>,
    /// Applied both as connect timeout and whole-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpSinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSinkConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &crate::config::mask_api_key(self.api_key.as_deref()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Posts each record as a JSON document to the LogHub collector.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    config: HttpSinkConfig,
}

impl HttpSink {
    /// Construct a new sink instance using the provided configuration.
    ///
    /// **Returns**
    /// - `Err(..)` if the underlying HTTP client could not be built (TLS
    ///   backend initialisation failure).
    pub fn new(config: HttpSinkConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        // Serialization failures return before any network I/O.
        let body = record.to_json()?;

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.header(API_KEY_HEADER, key);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("LogHub collector responded with status {}", resp.status()).into())
        }
    }
}
