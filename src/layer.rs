use crate::guard::contain;
use crate::level::LogLevel;
use crate::pipeline::Pipeline;
use crate::record::{current_thread_name, Failure, RawRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// `tracing_subscriber` layer that turns events into [`RawRecord`]s and
/// submits them to a [`Pipeline`].
///
/// Level filtering happens before any field is visited, so events below
/// the pipeline threshold cost a comparison. Events emitted by this crate
/// are ignored to keep its own diagnostics out of the pipeline.
pub struct ShipperLayer {
    pipeline: Arc<Pipeline>,
}

impl ShipperLayer {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl<S> Layer<S> for ShipperLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own_target(meta.target()) {
            return;
        }
        let level = LogLevel::from(*meta.level());
        if !self.pipeline.accepts(level) {
            return;
        }

        let raw = contain("on_event", || {
            let mut visitor = FieldVisitor::default();
            event.record(&mut visitor);

            let mut raw = RawRecord::new(level, visitor.message.unwrap_or_default())
                .with_logger(meta.target())
                .with_thread(current_thread_name());
            raw.context = visitor.fields;
            raw.failure = visitor.failure;
            raw
        });

        if let Some(raw) = raw {
            self.pipeline.submit(raw);
        }
    }
}

/// Collects event fields as strings.
#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
    message: Option<String>,
    failure: Option<Failure>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.failure.is_none() {
            self.failure = Some(Failure::new(field.name(), value.to_string()));
        } else {
            self.insert(field, value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShipperConfig;
    use crate::record::CanonicalRecord;
    use crate::sink::LogSink;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::error::Error;
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<CanonicalRecord>>,
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn send(&self, record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.records.lock().push(record.clone());
            Ok(())
        }
    }

    impl RecordingSink {
        async fn wait_for(&self, count: usize) -> Vec<CanonicalRecord> {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
            while self.records.lock().len() < count && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            self.records.lock().clone()
        }
    }

    #[derive(Debug)]
    struct Timeout;

    impl std::fmt::Display for Timeout {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("upstream timed out")
        }
    }

    impl Error for Timeout {}

    fn pipeline(sink: Arc<RecordingSink>) -> Arc<Pipeline> {
        let config = ShipperConfig::new("http://127.0.0.1:9/api/logs")
            .with_application("layer-test")
            .with_environment("test");
        let pipeline = Arc::new(Pipeline::with_sink(config, sink));
        pipeline.start();
        pipeline
    }

    #[test]
    fn recognises_own_targets() {
        assert!(is_own_target("loghub_shipper"));
        assert!(is_own_target("loghub_shipper::worker"));
        assert!(!is_own_target("loghub_shipper_ext"));
        assert!(!is_own_target("orders::api"));
    }

    #[tokio::test]
    async fn ships_events_with_fields_and_failure() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(sink.clone());
        let subscriber = Registry::default().with(ShipperLayer::new(Arc::clone(&pipeline)));

        tracing::subscriber::with_default(subscriber, || {
            let err = Timeout;
            tracing::warn!(
                target: "orders::api",
                order_id = 42,
                retry = true,
                error = &err as &(dyn Error + 'static),
                "payment for {} failed",
                "ORD-1"
            );
        });

        let records = sink.wait_for(1).await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.application, "layer-test");
        assert_eq!(record.level, LogLevel::Warn);
        assert_eq!(record.message, "payment for ORD-1 failed");
        assert_eq!(record.metadata["order_id"], "42");
        assert_eq!(record.metadata["retry"], "true");
        assert_eq!(record.metadata["logger"], "orders::api");
        assert_eq!(record.metadata["exception.class"], "error");
        assert_eq!(record.metadata["exception.message"], "upstream timed out");

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn skips_events_below_threshold_and_own_diagnostics() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(sink.clone());
        let subscriber = Registry::default().with(ShipperLayer::new(Arc::clone(&pipeline)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "orders::api", "too chatty");
            tracing::error!(target: "loghub_shipper::worker", "internal");
            tracing::info!(target: "orders::api", "kept");
        });

        let records = sink.wait_for(1).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "kept");
        assert_eq!(pipeline.stats().submitted, 1);

        pipeline.shutdown().await;
    }
}
