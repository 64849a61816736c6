use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use loghub_shipper::{
    config::ShipperConfig,
    init::{init_tracing_with_sink, LayerConfig},
    record::CanonicalRecord,
    sink::LogSink,
};

/// Example of replacing the HTTP transport by implementing the `LogSink`
/// trait directly. Records arrive already enriched and redacted.
struct StdoutJsonSink;

#[async_trait]
impl LogSink for StdoutJsonSink {
    async fn send(&self, record: &CanonicalRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let json = record.to_json()?;
        println!("[stdout-sink] {}", String::from_utf8_lossy(&json));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let sink: Arc<dyn LogSink> = Arc::new(StdoutJsonSink);
    let config = LayerConfig {
        shipper: ShipperConfig::default()
            .with_application("custom-sink-example")
            .with_environment("local"),
        enable_stdout: false,
    };

    let pipeline = match init_tracing_with_sink(sink, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    info!("custom sink example started");
    error!(user_password = "s3cr3t-value", "login failed for jane.doe@example.com");

    pipeline.shutdown().await;
}
