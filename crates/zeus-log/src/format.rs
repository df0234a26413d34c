//! JSON entry encoding for the production profile.
//!
//! Every entry becomes one JSON object. Fields attached to the logger and
//! passed at the call site are written as top-level keys next to the
//! encoder's own keys.

use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Event field carrying the logger's structured fields as a JSON object.
pub(crate) const ATTRS_FIELD: &str = "attrs";

/// Event field marking an entry as fatal.
pub(crate) const FATAL_FIELD: &str = "fatal";

/// Prefix for structured fields whose key collides with a reserved key.
pub(crate) const SHADOWED_PREFIX: &str = "field.";

/// Keys owned by the encoder.
const RESERVED: &[&str] = &[
    "timestamp",
    "level",
    "message",
    "logger",
    "caller",
    "stacktrace",
];

/// Production event format: one flat JSON object per line.
pub(crate) struct ProductionFormat;

#[derive(Default)]
struct EntryCollector {
    entry: Map<String, Value>,
    attrs: Option<Map<String, Value>>,
    fatal: bool,
}

impl EntryCollector {
    fn record_value(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            (ATTRS_FIELD, Value::String(text)) => {
                match serde_json::from_str::<Map<String, Value>>(&text) {
                    Ok(attrs) => self.attrs = Some(attrs),
                    Err(_) => {
                        self.entry.insert(ATTRS_FIELD.to_string(), Value::String(text));
                    },
                }
            },
            (FATAL_FIELD, value) => self.fatal = value == Value::Bool(true),
            (name, value) => {
                self.entry.insert(name.to_string(), value);
            },
        }
    }
}

impl Visit for EntryCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }
}

impl<S, N> FormatEvent<S, N> for ProductionFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut timestamp = String::new();
        SystemTime.format_time(&mut Writer::new(&mut timestamp))?;

        let mut collector = EntryCollector::default();
        event.record(&mut collector);
        let EntryCollector {
            mut entry,
            attrs,
            fatal,
        } = collector;

        let level = if fatal {
            "FATAL".to_string()
        } else {
            event.metadata().level().to_string()
        };
        entry.insert("timestamp".to_string(), Value::String(timestamp));
        entry.insert("level".to_string(), Value::String(level));

        for (key, value) in attrs.into_iter().flatten() {
            let key = if RESERVED.contains(&key.as_str()) {
                format!("{SHADOWED_PREFIX}{key}")
            } else {
                key
            };
            entry.insert(key, value);
        }

        writeln!(writer, "{}", Value::Object(entry))
    }
}
