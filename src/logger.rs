use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Write as _};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::Serialize;

use crate::context;
use crate::level::Level;
use crate::record::{self, LogRecord};
use crate::sink::LogSink;

/// Process-wide output pipeline: schema constants, minimum severity and
/// the sink. Installed by `init::configure`, replaced wholesale on
/// reconfiguration so handlers never accumulate.
pub(crate) struct Handler {
    pub(crate) service_name: String,
    pub(crate) env_name: String,
    pub(crate) min_level: Level,
    pub(crate) sink: Arc<dyn LogSink>,
}

static HANDLER: RwLock<Option<Arc<Handler>>> = RwLock::new(None);

pub(crate) fn install(handler: Handler) {
    let mut slot = match HANDLER.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(Arc::new(handler));
}

pub(crate) fn current() -> Option<Arc<Handler>> {
    let slot = match HANDLER.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.clone()
}

impl Handler {
    pub(crate) fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    /// Assemble the final record and hand it to the sink. The timestamp
    /// and the correlation ID are both captured here, at format time.
    pub(crate) fn emit(
        &self,
        level: Level,
        logger: &str,
        module: &str,
        message: String,
        event: Option<String>,
        exception: Option<String>,
        fields: BTreeMap<String, serde_json::Value>,
    ) {
        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            service: self.service_name.clone(),
            env: self.env_name.clone(),
            correlation_id: context::get_correlation_id(),
            event,
            message,
            logger: logger.to_string(),
            module: module.to_string(),
            exception,
            fields,
        };

        match record.to_json_line() {
            Ok(line) => {
                if let Err(e) = self.sink.write_line(&line) {
                    eprintln!("log sink write failed, dropping record: {}", e);
                }
            }
            Err(e) => eprintln!("log record serialization failed, dropping record: {}", e),
        }
    }
}

/// Named logging channel. Handles are cheap to clone and all share the
/// single configured handler; `get("a")` called twice yields equivalent
/// channels.
#[derive(Debug, Clone)]
pub struct Logger {
    name: Arc<str>,
}

/// Get a named logging channel, typically identified by the emitting
/// module (`get(module_path!())` or a fixed component name).
pub fn get(name: &str) -> Logger {
    Logger {
        name: Arc::from(name),
    }
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a record at an explicit severity. Below the configured
    /// minimum this returns an inert builder: no field conversion, no
    /// formatting, no output.
    pub fn log(&self, level: Level, message: impl Into<String>) -> LogBuilder<'_> {
        let active = current()
            .filter(|handler| handler.enabled(level))
            .map(|handler| ActiveRecord {
                handler,
                level,
                message: message.into(),
                event: None,
                exception: None,
                fields: BTreeMap::new(),
            });
        LogBuilder {
            logger: self,
            active,
        }
    }

    pub fn debug(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.log(Level::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.log(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.log(Level::Error, message)
    }

    pub fn critical(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.log(Level::Critical, message)
    }

    /// Report an error at ERROR severity with its full source chain in
    /// the `exception` field. The error itself is left untouched for the
    /// caller to propagate.
    pub fn exception(
        &self,
        message: impl Into<String>,
        error: &(dyn Error + 'static),
    ) -> LogBuilder<'_> {
        let mut builder = self.log(Level::Error, message);
        if let Some(active) = builder.active.as_mut() {
            active.exception = Some(format_error_chain(error));
        }
        builder
    }
}

struct ActiveRecord {
    handler: Arc<Handler>,
    level: Level,
    message: String,
    event: Option<String>,
    exception: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
}

/// In-flight log record. Attach the machine-readable event tag and extra
/// fields, then finish with [`LogBuilder::emit`].
#[must_use = "a log record does nothing until `.emit()` is called"]
pub struct LogBuilder<'a> {
    logger: &'a Logger,
    active: Option<ActiveRecord>,
}

impl LogBuilder<'_> {
    /// Set the machine-readable event tag. Independent of the message;
    /// records without a tag serialize `event` as null.
    pub fn event(mut self, tag: impl Into<String>) -> Self {
        if let Some(active) = self.active.as_mut() {
            active.event = Some(tag.into());
        }
        self
    }

    /// Attach an extra key/value pair, merged at the top level of the
    /// JSON object. Keys colliding with reserved schema fields are
    /// dropped; values that cannot be represented as JSON degrade to
    /// their `Debug` rendering.
    pub fn field<V: Serialize + fmt::Debug>(mut self, key: &str, value: V) -> Self {
        if let Some(active) = self.active.as_mut() {
            if !record::is_reserved(key) {
                active
                    .fields
                    .insert(key.to_string(), record::coerce_value(&value));
            }
        }
        self
    }

    /// Format and write the record. A no-op when the severity is below
    /// the configured minimum or logging was never configured.
    pub fn emit(self) {
        if let Some(active) = self.active {
            let module = module_from_name(self.logger.name());
            active.handler.emit(
                active.level,
                self.logger.name(),
                module,
                active.message,
                active.event,
                active.exception,
                active.fields,
            );
        }
    }
}

/// Render an error and its `source()` chain as one string, outermost
/// first.
pub fn format_error_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(rendered, "\ncaused by: {}", cause);
        source = cause.source();
    }
    rendered
}

/// Source module name for a channel: the trailing segment of a
/// `::`-separated path, mirroring how `module_path!` tails read.
pub(crate) fn module_from_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(thiserror::Error, Debug)]
    #[error("policy evaluation failed")]
    struct Outer {
        #[source]
        source: Inner,
    }

    #[derive(thiserror::Error, Debug)]
    #[error("rule set is empty")]
    struct Inner;

    #[test]
    fn error_chain_renders_outermost_first() {
        let error = Outer { source: Inner };
        assert_eq!(
            format_error_chain(&error),
            "policy evaluation failed\ncaused by: rule set is empty"
        );
    }

    #[test]
    fn error_without_source_renders_alone() {
        let error = Inner;
        assert_eq!(format_error_chain(&error), "rule set is empty");
    }

    #[test]
    fn module_is_the_trailing_path_segment() {
        assert_eq!(module_from_name("security_automation"), "security_automation");
        assert_eq!(module_from_name("app::policy::engine"), "engine");
    }

    #[test]
    fn equivalent_handles_share_a_name() {
        assert_eq!(get("channel").name(), get("channel").name());
    }
}
