use crate::backend::{make_sink_from_config, BackendBuildError};
use crate::buffer::Buffer;
use crate::config::{ApiKeySource, ConfigError, ShipperConfig};
use crate::dispatch::Dispatcher;
use crate::enrich::Enricher;
use crate::env::LOGHUB_API_KEY_ENV;
use crate::guard::contain;
use crate::level::LogLevel;
use crate::record::RawRecord;
use crate::redact::Redactor;
use crate::sink::LogSink;
use crate::worker::{PoolState, WorkerPool};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing what happened to submitted records.
#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    filtered: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    dispatched: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Every call to [`Pipeline::submit`].
    pub submitted: u64,
    /// Below the threshold, disabled, or submitted to an inert pipeline.
    pub filtered: u64,
    pub enqueued: u64,
    /// Rejected by the buffer (full or closed) or lost to an internal error.
    pub dropped: u64,
    /// Handed to the sink by a worker.
    pub dispatched: u64,
    /// Dequeued but not sent because the dispatcher was saturated or closed.
    pub skipped: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of construction, reported by the first [`Pipeline::start`].
enum Startup {
    Ready { api_key_source: Option<ApiKeySource> },
    Disabled,
    Inert(String),
}

struct Active {
    enricher: Enricher,
    buffer: Arc<Buffer>,
    dispatcher: Arc<Dispatcher>,
    pool: WorkerPool,
}

/// Entry point tying enrichment, buffering, workers and dispatch together.
///
/// A pipeline whose configuration is unusable is built *inert*: it accepts
/// every call and drops every record, so a bad config never fails host
/// startup. The reason is logged once, by the first call to
/// [`start`](Self::start), so it reaches whatever subscriber the host
/// installed in between.
pub struct Pipeline {
    minimum_level: LogLevel,
    enabled: bool,
    redactor: Arc<Redactor>,
    stats: Arc<PipelineStats>,
    active: Option<Active>,
    startup: Startup,
    reported: AtomicBool,
    shut_down: AtomicBool,
}

impl Pipeline {
    /// Build a pipeline shipping to the HTTP endpoint in `config`.
    pub fn new(config: ShipperConfig) -> Self {
        match make_sink_from_config(&config) {
            Ok(sink) => {
                let startup = Startup::Ready {
                    api_key_source: Some(config.api_key_source()),
                };
                Self::assemble(&config, Some(sink), startup)
            }
            Err(BackendBuildError::Config(ConfigError::Disabled)) => Self::assemble(&config, None, Startup::Disabled),
            Err(e) => Self::assemble(&config, None, Startup::Inert(e.to_string())),
        }
    }

    /// Build a pipeline around a caller-supplied sink. The endpoint in
    /// `config` is not consulted.
    pub fn with_sink(config: ShipperConfig, sink: Arc<dyn LogSink>) -> Self {
        if !config.enabled {
            return Self::assemble(&config, None, Startup::Disabled);
        }
        Self::assemble(&config, Some(sink), Startup::Ready { api_key_source: None })
    }

    fn assemble(config: &ShipperConfig, sink: Option<Arc<dyn LogSink>>, startup: Startup) -> Self {
        let redactor = Arc::new(Redactor::new());
        let stats = Arc::new(PipelineStats::default());

        let active = sink.map(|sink| {
            let enricher = Enricher::new(
                config.application.clone(),
                config.environment.clone(),
                Arc::clone(&redactor),
                config.mask_sensitive_data,
            );
            let buffer = Arc::new(Buffer::new(config.effective_queue_capacity()));
            let dispatcher = Arc::new(Dispatcher::new(sink, config.effective_max_in_flight()));
            let pool = WorkerPool::new(
                Arc::clone(&buffer),
                Arc::clone(&dispatcher),
                Arc::clone(&stats),
                config.effective_worker_threads(),
                config.poll_interval(),
                config.shutdown_grace(),
            );
            Active {
                enricher,
                buffer,
                dispatcher,
                pool,
            }
        });

        Self {
            minimum_level: config.minimum_level,
            enabled: config.enabled,
            redactor,
            stats,
            active,
            startup,
            reported: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Start the worker pool. Must run inside a Tokio runtime; repeated
    /// calls are no-ops, and so is a call after [`shutdown`](Self::shutdown).
    pub fn start(&self) {
        if !self.reported.swap(true, Ordering::AcqRel) {
            self.report_startup();
        }
        let Some(active) = &self.active else {
            return;
        };
        if self.shut_down.load(Ordering::Acquire) {
            tracing::debug!("LogHub pipeline already shut down, start ignored");
            return;
        }
        if active.pool.start() {
            tracing::info!(
                capacity = active.buffer.capacity(),
                minimum_level = %self.minimum_level,
                "LogHub pipeline started"
            );
        }
    }

    fn report_startup(&self) {
        match &self.startup {
            Startup::Inert(reason) => {
                tracing::error!(error = %reason, "LogHub pipeline is inert, records will be dropped");
            }
            Startup::Disabled => tracing::info!("LogHub shipping disabled by configuration"),
            Startup::Ready { api_key_source } => match api_key_source {
                Some(ApiKeySource::Config) => tracing::info!("using LogHub API key from configuration"),
                Some(ApiKeySource::Override) => tracing::info!("using LogHub API key from process override"),
                Some(ApiKeySource::Environment) => {
                    tracing::info!(env = LOGHUB_API_KEY_ENV, "using LogHub API key from environment")
                }
                Some(ApiKeySource::Missing) => {
                    tracing::warn!("no LogHub API key configured, requests may be rejected with 401")
                }
                None => {}
            },
        }
    }

    /// Whether a record at `level` would be enriched and buffered.
    pub fn accepts(&self, level: LogLevel) -> bool {
        self.enabled && self.active.is_some() && level >= self.minimum_level
    }

    /// Hand a record to the pipeline. Never blocks on I/O, never panics and
    /// never reports an error; a record that cannot be buffered is dropped.
    pub fn submit(&self, raw: RawRecord) {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if contain("submit", || self.enqueue(raw)).is_none() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn enqueue(&self, raw: RawRecord) {
        let active = match &self.active {
            Some(active) if self.accepts(raw.level) => active,
            _ => {
                self.stats.filtered.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let record = active.enricher.convert(raw);
        if active.buffer.enqueue(record) {
            self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drain and stop the workers, then release the sink. Idempotent.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(active) = &self.active else {
            return;
        };
        active.pool.stop().await;
        // the pool may never have started; make sure the buffer is closed
        active.buffer.close();
        active.dispatcher.close().await;
        tracing::info!(stats = ?self.stats.snapshot(), "LogHub pipeline shut down");
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Records currently waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.active.as_ref().map_or(0, |active| active.buffer.len())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.pool.state() == PoolState::Running)
    }

    /// Registry used to mask sensitive metadata fields. Changes apply to
    /// records submitted afterwards.
    pub fn redactor(&self) -> &Arc<Redactor> {
        &self.redactor
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // lets detached workers run out once the buffer is empty
        if let Some(active) = &self.active {
            active.buffer.close();
        }
    }
}
