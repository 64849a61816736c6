use crate::record::CanonicalRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous transport for [`CanonicalRecord`]s.
///
/// The [`Dispatcher`](crate::dispatch::Dispatcher) calls `send` from a
/// detached Tokio task and discards the result, so implementations only
/// report errors for diagnostics; nothing is retried.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single record.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the record.
    /// - `Err(..)` on serialization, network or HTTP status failure. The
    ///   error is logged at `debug` by the dispatcher and then dropped.
    async fn send(&self, record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Called once when the dispatcher closes. Default implementation is a
    /// no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
