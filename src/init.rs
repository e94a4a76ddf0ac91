use std::str::FromStr;
use std::sync::{Arc, Once};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::env;
use crate::layer::JsonLogLayer;
use crate::level::{Level, ParseLevelError};
use crate::logger::{self, Handler};
use crate::sink::{LogSink, StdoutSink};

/// Logging configuration: schema constants plus the minimum severity.
///
/// **Fields**
/// - `service_name`: static `service` value stamped on every record.
/// - `env_name`: static `env` value (local, dev, prod, etc.).
/// - `min_level`: records below this severity are discarded before any
///   formatting work happens.
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub service_name: String,
    pub env_name: String,
    pub min_level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: env::DEFAULT_SERVICE_NAME.to_string(),
            env_name: env::DEFAULT_ENV_NAME.to_string(),
            min_level: Level::Info,
        }
    }
}

impl LogConfig {
    /// Build a configuration from `SERVICE_NAME`, `ENV` and `LOG_LEVEL`,
    /// falling back to the documented defaults for unset variables.
    ///
    /// An unparseable `LOG_LEVEL` fails fast with [`ConfigError`] rather
    /// than silently defaulting.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_level = env::env_or(env::LOG_LEVEL_ENV, env::DEFAULT_LOG_LEVEL);
        let min_level =
            Level::from_str(&raw_level).map_err(|source| ConfigError::InvalidLevel {
                var: env::LOG_LEVEL_ENV,
                source,
            })?;

        Ok(Self {
            service_name: env::env_or(env::SERVICE_NAME_ENV, env::DEFAULT_SERVICE_NAME),
            env_name: env::env_or(env::ENV_NAME_ENV, env::DEFAULT_ENV_NAME),
            min_level,
        })
    }
}

/// Error type returned when building a configuration from the process
/// environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid log level in {var}: {source}")]
    InvalidLevel {
        var: &'static str,
        source: ParseLevelError,
    },
}

/// (Re-)initialize the global log pipeline with a stdout sink.
///
/// **Effects**
///
/// Replaces any previously installed handler, so repeated configuration
/// never stacks sinks and a single log call never emits twice. The first
/// call also installs the `tracing` bridge (see [`JsonLogLayer`]) as the
/// global subscriber; later calls leave the bridge in place and only swap
/// the handler it writes through.
pub fn configure(config: LogConfig) {
    configure_with_sink(config, Arc::new(StdoutSink));
}

/// Same as [`configure`], with an explicit sink. This is the entrypoint
/// for tests (`MemorySink`) and for embedding the pipeline behind a
/// different line-oriented destination.
pub fn configure_with_sink(config: LogConfig, sink: Arc<dyn LogSink>) {
    logger::install(Handler {
        service_name: config.service_name,
        env_name: config.env_name,
        min_level: config.min_level,
        sink,
    });
    install_bridge();
}

/// Configure from the process environment: [`LogConfig::from_env`] plus
/// [`configure`].
pub fn configure_from_env() -> Result<(), ConfigError> {
    let config = LogConfig::from_env()?;
    configure(config);
    Ok(())
}

static BRIDGE: Once = Once::new();

fn install_bridge() {
    BRIDGE.call_once(|| {
        let subscriber = Registry::default().with(JsonLogLayer);
        // Another global subscriber may already be installed by the host
        // application; the handler above still receives facade records,
        // only `tracing` events keep flowing to the foreign subscriber.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "ai-system-security-automation");
        assert_eq!(config.env_name, "local");
        assert_eq!(config.min_level, Level::Info);
    }
}
