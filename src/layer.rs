use std::collections::BTreeMap;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::level::Level;
use crate::logger;
use crate::record;

/// `tracing_subscriber` layer that forwards `tracing` events into the
/// configured JSON handler, so library code instrumented with `tracing`
/// macros shares the schema, severity filter, sink and correlation ID of
/// the facade.
///
/// Field mapping: `message` becomes the record message, a string field
/// named `event` becomes the machine-readable event tag, everything else
/// is merged as extras under the usual reserved-key rules. The channel
/// name is the event target and the module is the `module_path!` tail.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLogLayer;

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(handler) = logger::current() else {
            return;
        };

        let level = map_level(event.metadata().level());
        if !handler.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        let module = meta
            .module_path()
            .map(logger::module_from_name)
            .unwrap_or_else(|| meta.target());

        handler.emit(
            level,
            meta.target(),
            module,
            visitor.message.unwrap_or_default(),
            visitor.event,
            None,
            visitor.fields,
        );
    }
}

/// `tracing` severities folded onto the five-level schema. `TRACE` has no
/// counterpart and reports as `DEBUG`; `CRITICAL` is only reachable
/// through the facade.
fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    event: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
}

impl FieldVisitor {
    fn insert(&mut self, name: &str, value: serde_json::Value) {
        if record::is_reserved(name) {
            return;
        }
        self.fields.insert(name.to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            name => self.insert(name, serde_json::Value::String(value.to_string())),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field.name(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field.name(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // Non-finite floats have no JSON number form.
        let json = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string()));
        self.insert(field.name(), json);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field.name(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        // The event message arrives here as `fmt::Arguments`.
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            name => self.insert(name, serde_json::Value::String(format!("{:?}", value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_and_debug_fold_to_debug() {
        assert_eq!(map_level(&tracing::Level::TRACE), Level::Debug);
        assert_eq!(map_level(&tracing::Level::DEBUG), Level::Debug);
        assert_eq!(map_level(&tracing::Level::INFO), Level::Info);
        assert_eq!(map_level(&tracing::Level::WARN), Level::Warning);
        assert_eq!(map_level(&tracing::Level::ERROR), Level::Error);
    }
}
