use crate::config::ShipperConfig;
use crate::layer::ShipperLayer;
use crate::pipeline::Pipeline;
use crate::sink::LogSink;
use std::sync::Arc;
use tracing::Subscriber;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

/// Errors raised while installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Settings for the subscriber installed by the `init_tracing*` helpers.
///
/// **Fields**
/// - `shipper`: [`ShipperConfig`] for the pipeline behind the layer.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked next to [`ShipperLayer`] so events are also printed locally.
///   The shipper's own events are printed from `INFO` up.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub shipper: ShipperConfig,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            shipper: ShipperConfig::default(),
            enable_stdout: true,
        }
    }
}

impl From<ShipperConfig> for LayerConfig {
    fn from(shipper: ShipperConfig) -> Self {
        Self {
            shipper,
            ..Self::default()
        }
    }
}

/// `fmt` layer for local printing. Host events pass at every level; the
/// shipper's own per-record diagnostics stay below the `INFO` cut-off.
pub(crate) fn stdout_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let targets = Targets::new()
        .with_default(LevelFilter::TRACE)
        .with_target(env!("CARGO_CRATE_NAME"), LevelFilter::INFO);
    tracing_subscriber::fmt::layer().with_writer(writer).with_filter(targets)
}

/// Install the global subscriber around an existing pipeline and start it.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`ShipperLayer`] (and the `fmt`
/// layer when `enable_stdout` is set) as the global default subscriber,
/// so every `tracing` event in the process reaches the pipeline. Must be
/// called from within a Tokio runtime for the workers to start.
///
/// The pipeline is started after the subscriber is in place, so its
/// startup report (inert reason, API key source) is visible.
pub fn install(pipeline: Arc<Pipeline>, enable_stdout: bool) -> Result<Arc<Pipeline>, InitError> {
    install_with_writer(pipeline, enable_stdout, std::io::stdout)
}

/// [`install`] printing to `writer` instead of stdout.
pub fn install_with_writer<W>(pipeline: Arc<Pipeline>, enable_stdout: bool, writer: W) -> Result<Arc<Pipeline>, InitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = ShipperLayer::new(Arc::clone(&pipeline));

    // The two branches produce different subscriber types.
    if enable_stdout {
        let subscriber = Registry::default().with(layer).with(stdout_layer(writer));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    pipeline.start();
    Ok(pipeline)
}

/// Initialize tracing with a pipeline shipping to the configured HTTP
/// endpoint.
///
/// **Returns**
///
/// The shared [`Pipeline`], so the host can call
/// [`Pipeline::shutdown`] before exiting. A config without a usable
/// endpoint still installs the subscriber; the pipeline is then inert.
pub fn init_tracing_with_config(config: LayerConfig) -> Result<Arc<Pipeline>, InitError> {
    init_tracing_with_writer(config, std::io::stdout)
}

/// [`init_tracing_with_config`] printing to `writer` instead of stdout.
pub fn init_tracing_with_writer<W>(config: LayerConfig, writer: W) -> Result<Arc<Pipeline>, InitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let pipeline = Arc::new(Pipeline::new(config.shipper));
    install_with_writer(pipeline, config.enable_stdout, writer)
}

/// Initialize tracing with a caller-supplied [`LogSink`] instead of HTTP.
pub fn init_tracing_with_sink(sink: Arc<dyn LogSink>, config: LayerConfig) -> Result<Arc<Pipeline>, InitError> {
    let pipeline = Arc::new(Pipeline::with_sink(config.shipper, sink));
    install(pipeline, config.enable_stdout)
}

/// Equivalent to [`init_tracing_with_config`] with stdout printing on.
/// This is the recommended entrypoint for typical services.
pub fn init_tracing(config: ShipperConfig) -> Result<Arc<Pipeline>, InitError> {
    init_tracing_with_config(LayerConfig::from(config))
}

/// [`init_tracing`] with [`ShipperConfig::from_env`].
pub fn init_tracing_from_env() -> Result<Arc<Pipeline>, InitError> {
    init_tracing(ShipperConfig::from_env())
}
