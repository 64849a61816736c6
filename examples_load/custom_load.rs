use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use loghub_shipper::config::ShipperConfig;
use loghub_shipper::context::LogContext;
use loghub_shipper::init::{init_tracing_with_sink, LayerConfig};
use loghub_shipper::noop_sink::NoopSink;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let shipper = ShipperConfig {
        queue_capacity: 50_000,
        worker_threads: 4,
        max_in_flight: 512,
        poll_interval_ms: 20,
        ..ShipperConfig::default().with_application("custom-load")
    };
    let config = LayerConfig {
        shipper,
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

    {
        let _scope = LogContext::scoped([("tenant", "acme"), ("password", "hunter2hunter2")]);
        for i in 0..n {
            error!(iteration = i, card = "4111 1111 1111 1111", "custom load test error for john@example.com");
        }
    }

    let elapsed = start.elapsed();
    println!(
        "custom config: submitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    pipeline.shutdown().await;
    println!("{:?}", pipeline.stats());
}
