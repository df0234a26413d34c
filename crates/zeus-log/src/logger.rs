//! Logger handles.
//!
//! A [`Logger`] is an immutable handle over a `tracing` dispatcher. Naming it
//! or attaching fields produces a new handle; the parent keeps emitting
//! exactly what it emitted before.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Dispatch, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Separator between the segments of a hierarchical logger name.
pub const NAME_SEPARATOR: char = '.';

/// Minimum severity of the entries a logger emits.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation (default).
    #[default]
    Info,
    /// Something unexpected that the program recovered from.
    Warn,
    /// A failed operation.
    Error,
    /// An unrecoverable failure. Entries at this level carry a stack trace.
    Fatal,
}

impl LogLevel {
    /// All levels, from least to most severe.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
    ];

    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Level filter for the underlying subscriber.
    ///
    /// `tracing` has no level above `ERROR`, so fatal entries are emitted as
    /// errors and the fatal threshold is enforced by the handle itself.
    pub(crate) fn filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error | Self::Fatal => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no [`LogLevel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/// Preset bundle of encoding defaults a logger is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human-readable text lines without caller information.
    #[default]
    Development,
    /// One JSON object per entry, including the caller location.
    Production,
}

/// A structured key/value pair attached to log entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: Cow<'static, str>,
    value: serde_json::Value,
}

impl Field {
    /// Create a field.
    #[must_use]
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The field key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The field value.
    #[must_use]
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Shorthand for [`Field::new`].
#[must_use]
pub fn field(key: impl Into<Cow<'static, str>>, value: impl Into<serde_json::Value>) -> Field {
    Field::new(key, value)
}

/// Attached fields followed by call-site fields.
///
/// Rendered `k=v k=v` for text output, or as a JSON object for the
/// production encoder to expand into top-level keys.
struct Attrs<'a> {
    attached: &'a [Field],
    extra: &'a [Field],
    json: bool,
}

impl Attrs<'_> {
    fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.extra.is_empty()
    }
}

impl fmt::Display for Attrs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, separator, close) = if self.json {
            ("{", ",", "}")
        } else {
            ("", " ", "")
        };
        f.write_str(open)?;
        for (i, field) in self.attached.iter().chain(self.extra).enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            if self.json {
                write!(f, "{}:{}", serde_json::Value::from(field.key()), field.value())?;
            } else {
                write!(f, "{field}")?;
            }
        }
        f.write_str(close)
    }
}

/// Shared, clonable writer factory the fmt layer and [`Logger::sync`] both
/// write through.
#[derive(Clone)]
pub(crate) struct Sink(Arc<BoxMakeWriter>);

impl Sink {
    pub(crate) fn new<W>(writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self(Arc::new(BoxMakeWriter::new(writer)))
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        MakeWriter::make_writer(&*self.0).flush()
    }
}

impl<'a> MakeWriter<'a> for Sink {
    type Writer = Box<dyn Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        MakeWriter::make_writer(&*self.0)
    }
}

/// Everything a family of derived loggers has in common.
pub(crate) struct Core {
    pub(crate) dispatch: Dispatch,
    pub(crate) sink: Option<Sink>,
    pub(crate) level: LogLevel,
    pub(crate) profile: Profile,
    pub(crate) caller: bool,
    pub(crate) stacktrace_level: LogLevel,
}

impl Core {
    fn nop() -> Self {
        Self {
            dispatch: Dispatch::none(),
            sink: None,
            level: LogLevel::Fatal,
            profile: Profile::Development,
            caller: false,
            stacktrace_level: LogLevel::Fatal,
        }
    }
}

/// Handle to a configured structured-logging sink.
///
/// Cloning is cheap. [`named`](Self::named) and [`with`](Self::with) return
/// new handles and leave `self` untouched.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    name: Option<Arc<str>>,
    fields: Arc<[Field]>,
}

macro_rules! emit {
    ($level:expr, $($rest:tt)*) => {
        match $level {
            LogLevel::Debug => tracing::event!(Level::DEBUG, $($rest)*),
            LogLevel::Info => tracing::event!(Level::INFO, $($rest)*),
            LogLevel::Warn => tracing::event!(Level::WARN, $($rest)*),
            LogLevel::Error | LogLevel::Fatal => tracing::event!(Level::ERROR, $($rest)*),
        }
    };
}

impl Logger {
    pub(crate) fn from_core(core: Core) -> Self {
        Self {
            core: Arc::new(core),
            name: None,
            fields: Arc::from(Vec::new()),
        }
    }

    /// A logger that discards every entry.
    #[must_use]
    pub fn nop() -> Self {
        Self::from_core(Core::nop())
    }

    /// Derive a child logger whose name is suffixed with `suffix`.
    ///
    /// An empty suffix returns an identical handle.
    #[must_use]
    pub fn named(&self, suffix: &str) -> Self {
        if suffix.is_empty() {
            return self.clone();
        }
        let name = match &self.name {
            Some(parent) => format!("{parent}{NAME_SEPARATOR}{suffix}"),
            None => suffix.to_string(),
        };
        Self {
            core: Arc::clone(&self.core),
            name: Some(Arc::from(name)),
            fields: Arc::clone(&self.fields),
        }
    }

    /// Derive a child logger that attaches `fields` to every entry.
    ///
    /// No fields returns an identical handle.
    #[must_use]
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        let mut extra = fields.into_iter().peekable();
        if extra.peek().is_none() {
            return self.clone();
        }
        let fields: Vec<Field> = self.fields.iter().cloned().chain(extra).collect();
        Self {
            core: Arc::clone(&self.core),
            name: self.name.clone(),
            fields: Arc::from(fields),
        }
    }

    /// The hierarchical name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Fields attached to every entry, in attachment order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Minimum level this logger emits.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.core.level
    }

    /// Profile the logger was built from.
    #[must_use]
    pub fn profile(&self) -> Profile {
        self.core.profile
    }

    /// Whether this logger discards everything.
    #[must_use]
    pub fn is_nop(&self) -> bool {
        self.core.sink.is_none()
    }

    /// Whether an entry at `level` would be emitted.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        !self.is_nop() && level >= self.core.level
    }

    /// Whether both handles are the same logger: same core, same name and
    /// the same attached field list.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.core, &b.core) && a.name == b.name && Arc::ptr_eq(&a.fields, &b.fields)
    }

    /// Emit a debug entry.
    #[track_caller]
    pub fn debug(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Debug, message, fields);
    }

    /// Emit an info entry.
    #[track_caller]
    pub fn info(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Info, message, fields);
    }

    /// Emit a warning entry.
    #[track_caller]
    pub fn warn(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Warn, message, fields);
    }

    /// Emit an error entry.
    #[track_caller]
    pub fn error(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Error, message, fields);
    }

    /// Emit a fatal entry, flush, and terminate the process with status 1.
    #[track_caller]
    pub fn fatal(&self, message: &str, fields: &[Field]) -> ! {
        self.log(LogLevel::Fatal, message, fields);
        let _ = self.sync();
        std::process::exit(1)
    }

    /// Emit an entry at `level`.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: &str, fields: &[Field]) {
        if !self.enabled(level) {
            return;
        }
        let location = Location::caller();
        let caller = self
            .core
            .caller
            .then(|| format!("{}:{}", location.file(), location.line()));
        let stacktrace = (level >= self.core.stacktrace_level).then(Backtrace::force_capture);
        let attrs = Attrs {
            attached: &self.fields,
            extra: fields,
            json: self.core.profile == Profile::Production,
        };
        let attrs = (!attrs.is_empty()).then_some(attrs);
        let fatal = (level == LogLevel::Fatal).then_some(true);

        tracing::dispatcher::with_default(&self.core.dispatch, || {
            emit!(
                level,
                logger = self.name.as_deref(),
                caller = caller.as_deref(),
                attrs = attrs.as_ref().map(tracing::field::display),
                fatal,
                stacktrace = stacktrace.as_ref().map(tracing::field::display),
                "{message}"
            );
        });
    }

    /// Flush buffered entries to the sink.
    ///
    /// # Errors
    ///
    /// Returns the sink's flush error.
    pub fn sync(&self) -> io::Result<()> {
        match &self.core.sink {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("level", &self.core.level)
            .field("profile", &self.core.profile)
            .field("nop", &self.is_nop())
            .finish()
    }
}
