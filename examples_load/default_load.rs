use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use loghub_shipper::config::ShipperConfig;
use loghub_shipper::init::{init_tracing_with_sink, LayerConfig};
use loghub_shipper::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let config = LayerConfig {
        shipper: ShipperConfig::default().with_application("default-load"),
        enable_stdout: false,
    };
    let pipeline = match init_tracing_with_sink(Arc::new(NoopSink), config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        info!(iteration = i, "default load test event");
    }

    let elapsed = start.elapsed();
    println!(
        "default config: submitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    pipeline.shutdown().await;
    println!("{:?}", pipeline.stats());
}
