use crate::buffer::Buffer;
use crate::dispatch::Dispatcher;
use crate::guard::contain;
use crate::pipeline::PipelineStats;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Lifecycle of a [`WorkerPool`]: `Stopped -> Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Stopped,
    Running,
    Draining,
}

struct PoolInner {
    state: PoolState,
    handles: Vec<JoinHandle<()>>,
}

/// Fixed set of Tokio tasks draining the [`Buffer`] into the [`Dispatcher`].
///
/// Workers are plain runtime tasks, so they never keep the process alive.
pub struct WorkerPool {
    buffer: Arc<Buffer>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<PipelineStats>,
    worker_count: usize,
    poll_interval: Duration,
    shutdown_grace: Duration,
    inner: Mutex<PoolInner>,
    // serializes concurrent `stop` calls
    stopping: tokio::sync::Mutex<()>,
}

impl WorkerPool {
    pub fn new(
        buffer: Arc<Buffer>,
        dispatcher: Arc<Dispatcher>,
        stats: Arc<PipelineStats>,
        worker_count: usize,
        poll_interval: Duration,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            buffer,
            dispatcher,
            stats,
            worker_count: worker_count.max(1),
            poll_interval,
            shutdown_grace,
            inner: Mutex::new(PoolInner {
                state: PoolState::Stopped,
                handles: Vec::new(),
            }),
            stopping: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// Open the buffer and spawn the workers on the current Tokio runtime.
    ///
    /// **Returns**
    /// - `true` if workers were spawned by this call.
    /// - `false` if the pool was already running or draining, or no
    ///   runtime is available (the pool then stays stopped).
    pub fn start(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != PoolState::Stopped {
            return false;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "no Tokio runtime available, LogHub workers not started");
                return false;
            }
        };

        self.buffer.open();
        inner.handles = (0..self.worker_count)
            .map(|id| {
                runtime.spawn(worker_loop(
                    id,
                    Arc::clone(&self.buffer),
                    Arc::clone(&self.dispatcher),
                    Arc::clone(&self.stats),
                    self.poll_interval,
                ))
            })
            .collect();
        inner.state = PoolState::Running;
        tracing::debug!(workers = self.worker_count, "LogHub worker pool started");
        true
    }

    /// Close the buffer, let the workers drain it for up to the grace
    /// period, then abort whatever is still running.
    ///
    /// When this returns the pool is `Stopped` and no worker is left.
    pub async fn stop(&self) {
        let _stopping = self.stopping.lock().await;

        let mut handles = {
            let mut inner = self.inner.lock();
            if inner.state != PoolState::Running {
                return;
            }
            inner.state = PoolState::Draining;
            self.buffer.close();
            std::mem::take(&mut inner.handles)
        };

        let drained = tokio::time::timeout(self.shutdown_grace, async {
            for handle in handles.iter_mut() {
                let _ = handle.await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = self.buffer.len(),
                "LogHub workers did not drain within grace period, aborting"
            );
            for handle in &handles {
                handle.abort();
            }
            for handle in handles {
                let _ = handle.await;
            }
        }

        self.inner.lock().state = PoolState::Stopped;
        tracing::debug!("LogHub worker pool stopped");
    }
}

async fn worker_loop(
    id: usize,
    buffer: Arc<Buffer>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<PipelineStats>,
    poll_interval: Duration,
) {
    while buffer.is_open() || !buffer.is_empty() {
        let Some(record) = buffer.dequeue(poll_interval).await else {
            continue;
        };

        match contain("dispatch", || dispatcher.send(record)) {
            Some(dispatch) if dispatch.is_spawned() => stats.record_dispatched(),
            _ => stats.record_skipped(),
        }
    }
    tracing::trace!(worker = id, "LogHub worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LogLevel;
    use crate::record::{CanonicalRecord, SdkInfo};
    use crate::sink::LogSink;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(message: &str) -> CanonicalRecord {
        CanonicalRecord {
            application: "app".to_string(),
            environment: "test".to_string(),
            level: LogLevel::Info,
            message: message.to_string(),
            timestamp: Utc::now(),
            trace_id: None,
            metadata: BTreeMap::new(),
            sdk: SdkInfo::current(),
        }
    }

    #[derive(Default)]
    struct CountingSink {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl LogSink for CountingSink {
        async fn send(&self, _record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pool(sink: Arc<dyn LogSink>, capacity: usize, workers: usize, grace: Duration) -> (Arc<Buffer>, WorkerPool) {
        let buffer = Arc::new(Buffer::new(capacity));
        let dispatcher = Arc::new(Dispatcher::new(sink, 16));
        let pool = WorkerPool::new(
            Arc::clone(&buffer),
            dispatcher,
            Arc::new(PipelineStats::default()),
            workers,
            Duration::from_millis(10),
            grace,
        );
        (buffer, pool)
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (buffer, pool) = pool(Arc::new(CountingSink::default()), 8, 2, Duration::from_secs(2));

        assert_eq!(pool.state(), PoolState::Stopped);
        assert!(!buffer.is_open());
        assert!(pool.start());
        assert!(!pool.start());
        assert_eq!(pool.state(), PoolState::Running);
        assert!(buffer.is_open());

        pool.stop().await;
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[tokio::test]
    async fn workers_drain_buffer_into_sink() {
        let sink = Arc::new(CountingSink::default());
        let (buffer, pool) = pool(sink.clone(), 64, 2, Duration::from_secs(2));
        pool.start();

        for i in 0..20 {
            assert!(buffer.enqueue(record(&i.to_string())));
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while sink.sent.load(Ordering::SeqCst) < 20 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sink.sent.load(Ordering::SeqCst), 20);
        pool.stop().await;
    }

    #[tokio::test]
    async fn stop_drains_remaining_records_and_rejects_new_ones() {
        let sink = Arc::new(CountingSink::default());
        let (buffer, pool) = pool(sink.clone(), 64, 1, Duration::from_secs(2));
        pool.start();

        for i in 0..10 {
            buffer.enqueue(record(&i.to_string()));
        }
        pool.stop().await;

        assert!(buffer.is_empty());
        assert!(!buffer.enqueue(record("after stop")));
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let (_buffer, pool) = pool(Arc::new(CountingSink::default()), 4, 1, Duration::from_secs(2));
        pool.stop().await;
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[tokio::test]
    async fn can_restart_after_stop() {
        let sink = Arc::new(CountingSink::default());
        let (buffer, pool) = pool(sink.clone(), 8, 1, Duration::from_secs(2));

        pool.start();
        pool.stop().await;
        assert!(pool.start());
        assert!(buffer.enqueue(record("second life")));
        pool.stop().await;
        assert!(buffer.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn records_accepted_while_stopping_are_all_handled() {
        let buffer = Arc::new(Buffer::new(256));
        let stats = Arc::new(PipelineStats::default());
        let pool = WorkerPool::new(
            Arc::clone(&buffer),
            Arc::new(Dispatcher::new(Arc::new(CountingSink::default()), 16)),
            Arc::clone(&stats),
            2,
            Duration::from_millis(1),
            Duration::from_secs(5),
        );
        pool.start();

        let accepted = Arc::new(AtomicUsize::new(0));
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                let accepted = Arc::clone(&accepted);
                std::thread::spawn(move || loop {
                    if buffer.enqueue(record("racing")) {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    } else if !buffer.is_open() {
                        break;
                    } else {
                        std::thread::yield_now();
                    }
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.stop().await;
        for producer in producers {
            producer.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert!(buffer.is_empty());
        assert_eq!((snapshot.dispatched + snapshot.skipped) as usize, accepted.load(Ordering::SeqCst));
    }

    #[test]
    fn start_outside_runtime_stays_stopped() {
        let (buffer, pool) = pool(Arc::new(CountingSink::default()), 4, 1, Duration::from_secs(2));
        assert!(!pool.start());
        assert_eq!(pool.state(), PoolState::Stopped);
        assert!(!buffer.is_open());
    }
}
