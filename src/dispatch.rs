use crate::record::CanonicalRecord;
use crate::sink::LogSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Why a record was not handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The dispatcher has been closed.
    Closed,
    /// `max_in_flight` requests are already outstanding.
    Saturated,
}

/// Outcome of [`Dispatcher::send`]. Workers drop it without awaiting.
#[derive(Debug)]
pub enum Dispatch {
    Spawned(JoinHandle<()>),
    Skipped(SkipReason),
}

impl Dispatch {
    /// Wait for the detached send to finish. Only tests need this.
    pub async fn wait(self) {
        if let Dispatch::Spawned(handle) = self {
            let _ = handle.await;
        }
    }

    pub fn is_spawned(&self) -> bool {
        matches!(self, Dispatch::Spawned(_))
    }
}

/// Fire-and-forget sender in front of a [`LogSink`].
///
/// Each record is sent from its own Tokio task; the caller never waits on
/// the network and never sees an error. Success, HTTP failures and
/// transport errors are all discarded: delivery is best-effort.
pub struct Dispatcher {
    sink: Arc<dyn LogSink>,
    in_flight: Arc<Semaphore>,
    max_in_flight: usize,
    closed: AtomicBool,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn LogSink>, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            sink,
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            closed: AtomicBool::new(false),
        }
    }

    /// Start sending `record` and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send(&self, record: CanonicalRecord) -> Dispatch {
        if self.closed.load(Ordering::Acquire) {
            return Dispatch::Skipped(SkipReason::Closed);
        }

        // Never wait for a permit: a stalled collector must not back up
        // into the workers or grow the number of pending tasks.
        let permit = match Arc::clone(&self.in_flight).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::trace!("dispatcher saturated, dropping record");
                return Dispatch::Skipped(SkipReason::Saturated);
            }
        };

        let sink = Arc::clone(&self.sink);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = sink.send(&record).await {
                tracing::debug!(error = %e, "log record delivery failed");
            }
        });
        Dispatch::Spawned(handle)
    }

    /// Number of sends currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight.saturating_sub(self.in_flight.available_permits())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting records and flush the sink. Safe to call repeatedly;
    /// only the first call does anything.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.in_flight.close();
        if let Err(e) = self.sink.flush().await {
            tracing::debug!(error = %e, "log sink flush failed on close");
        }
    }
}
