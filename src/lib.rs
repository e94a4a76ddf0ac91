pub mod context;
pub mod env;
pub mod init;
pub mod layer;
pub mod level;
pub mod logger;
pub mod record;
pub mod sink;

pub use context::{
    clear_correlation_id, get_correlation_id, scope_correlation_id, set_correlation_id,
    CorrelationGuard, CorrelationId,
};
pub use init::{configure, configure_from_env, configure_with_sink, ConfigError, LogConfig};
pub use layer::JsonLogLayer;
pub use level::{Level, ParseLevelError};
pub use logger::{get, LogBuilder, Logger};
pub use record::LogRecord;
pub use sink::{LogSink, MemorySink, StdoutSink};
