pub mod backend;
pub mod buffer;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod enrich;
pub mod env;
mod guard;
pub mod init;
pub mod layer;
pub mod level;
pub mod noop_sink;
pub mod pipeline;
pub mod record;
pub mod redact;
pub mod sink;
pub mod worker;

#[cfg(feature = "http")]
pub mod http;

pub use config::{set_api_key_override, ApiKeySource, ConfigError, ShipperConfig};
pub use context::{ContextScope, LogContext};
pub use init::{
    init_tracing, init_tracing_from_env, init_tracing_with_config, init_tracing_with_sink, init_tracing_with_writer,
    install, install_with_writer, InitError, LayerConfig,
};
pub use layer::ShipperLayer;
pub use level::LogLevel;
pub use pipeline::{Pipeline, StatsSnapshot};
pub use record::{CanonicalRecord, Failure, RawRecord};
pub use redact::Redactor;
pub use sink::LogSink;
