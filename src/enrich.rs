use crate::context::LogContext;
use crate::guard::contain;
use crate::record::{CanonicalRecord, RawRecord, SdkInfo};
use crate::redact::Redactor;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Context key carrying the distributed trace id.
pub const TRACE_ID_KEY: &str = "traceId";

pub const EXCEPTION_CLASS_KEY: &str = "exception.class";
pub const EXCEPTION_MESSAGE_KEY: &str = "exception.message";
pub const LOGGER_KEY: &str = "logger";
pub const THREAD_KEY: &str = "thread";

/// Turns host [`RawRecord`]s into redacted [`CanonicalRecord`]s.
///
/// Metadata is merged from, in order: the thread's [`LogContext`], the
/// record's own context (without `traceId`), failure details, then the
/// `logger` and `thread` identity. A later source overwrites an earlier
/// one when both use the same key.
pub struct Enricher {
    application: String,
    environment: String,
    sdk: SdkInfo,
    redactor: Arc<Redactor>,
    mask_sensitive_data: bool,
}

impl Enricher {
    pub fn new(
        application: impl Into<String>,
        environment: impl Into<String>,
        redactor: Arc<Redactor>,
        mask_sensitive_data: bool,
    ) -> Self {
        Self {
            application: application.into(),
            environment: environment.into(),
            sdk: SdkInfo::current(),
            redactor,
            mask_sensitive_data,
        }
    }

    pub fn redactor(&self) -> &Arc<Redactor> {
        &self.redactor
    }

    pub fn convert(&self, raw: RawRecord) -> CanonicalRecord {
        let message = if self.mask_sensitive_data {
            self.redactor.mask(&raw.message)
        } else {
            raw.message.clone()
        };

        let trace_id = raw
            .context
            .get(TRACE_ID_KEY)
            .cloned()
            .or_else(|| LogContext::get(TRACE_ID_KEY));

        // A failure while merging metadata still yields a record, only
        // without metadata.
        let metadata = contain("enrich", || self.metadata(&raw)).unwrap_or_default();

        let timestamp = DateTime::<Utc>::from_timestamp_millis(raw.timestamp_millis).unwrap_or_else(Utc::now);

        CanonicalRecord {
            application: self.application.clone(),
            environment: self.environment.clone(),
            level: raw.level,
            message,
            timestamp,
            trace_id,
            metadata,
            sdk: self.sdk.clone(),
        }
    }

    fn metadata(&self, raw: &RawRecord) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();

        for (key, value) in LogContext::snapshot() {
            let value = self.redact_field(&key, &value);
            metadata.insert(key, value);
        }

        for (key, value) in raw.context.iter().filter(|(key, _)| key.as_str() != TRACE_ID_KEY) {
            metadata.insert(key.clone(), self.redact_field(key, value));
        }

        if let Some(failure) = &raw.failure {
            metadata.insert(EXCEPTION_CLASS_KEY.to_string(), failure.class.clone());
            if let Some(message) = &failure.message {
                let message = if self.mask_sensitive_data {
                    self.redactor.mask(message)
                } else {
                    message.clone()
                };
                metadata.insert(EXCEPTION_MESSAGE_KEY.to_string(), message);
            }
        }

        metadata.insert(LOGGER_KEY.to_string(), raw.logger.clone());
        metadata.insert(THREAD_KEY.to_string(), raw.thread.clone());
        metadata
    }

    fn redact_field(&self, key: &str, value: &str) -> String {
        if self.mask_sensitive_data {
            self.redactor.mask_if_sensitive(key, value)
        } else {
            value.to_string()
        }
    }
}
