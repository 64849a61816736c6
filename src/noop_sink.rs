use crate::record::CanonicalRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// network I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
