use loghub_shipper::{init_tracing_with_writer, LayerConfig, LogLevel, RawRecord, ShipperConfig};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Collects everything the stdout layer prints.
#[derive(Clone, Default)]
struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// The global subscriber can be set once per process, so this file holds a
// single test.
#[tokio::test]
async fn missing_endpoint_is_reported_through_installed_subscriber() {
    let capture = CaptureWriter::default();
    let config = LayerConfig {
        shipper: ShipperConfig::default(),
        enable_stdout: true,
    };
    let pipeline = init_tracing_with_writer(config, capture.clone()).unwrap();
    assert!(!pipeline.is_active());

    // a second start must not repeat the report
    pipeline.start();
    tracing::error!(target: "orders", "still printed locally");
    pipeline.submit(RawRecord::new(LogLevel::Error, "dropped"));
    pipeline.shutdown().await;

    let output = capture.contents();
    assert!(output.contains("LogHub endpoint is required but not configured"));
    assert_eq!(output.matches("LogHub pipeline is inert").count(), 1);
    assert!(output.contains("still printed locally"));
    assert_eq!(pipeline.stats().filtered, 1);
}
