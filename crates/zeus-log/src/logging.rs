//! Root logger configuration and setup.
//!
//! The process-wide root logger is built once, on first use, from two
//! environment variables:
//!
//! - `GO_LOG`: minimum level (`debug`, `info`, `warn`, `error`, `fatal`)
//! - `GO_LOG_FORMAT`: encoding (`human` or `json`)
//!
//! Unrecognized values fall back to `info` and the human-readable profile and
//! are reported through the logger that was built from the fallback.

use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
};

use crate::error::{TelemetryError, TelemetryResult};
use crate::format::ProductionFormat;
use crate::logger::{Core, LogLevel, Logger, Profile, Sink, field};

/// Environment variable holding the minimum log level.
pub const LEVEL_ENV: &str = "GO_LOG";

/// Environment variable holding the log format.
pub const FORMAT_ENV: &str = "GO_LOG_FORMAT";

/// Entries at or above this level carry a captured stack trace.
const STACKTRACE_LEVEL: LogLevel = LogLevel::Fatal;

/// Helper to convert init errors to our error type.
fn init_err<E: std::fmt::Display>(e: E) -> TelemetryError {
    TelemetryError::InitError(e.to_string())
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text (default).
    #[default]
    Human,
    /// JSON lines for structured log collection.
    Json,
}

impl LogFormat {
    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }

    /// Profile a logger in this format is built from.
    #[must_use]
    pub fn profile(self) -> Profile {
        match self {
            Self::Human => Profile::Development,
            Self::Json => Profile::Production,
        }
    }
}

/// Returned when a string names no [`LogFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log format: {0:?}")]
pub struct ParseFormatError(String);

impl FromStr for LogFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Human, Self::Json]
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseFormatError(s.to_string()))
    }
}

/// Raw logging configuration.
///
/// Level and format are kept as the strings that were supplied so that
/// unrecognized values can be reported verbatim once the logger exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Requested minimum level, lowercased. Empty means unset.
    #[serde(default)]
    pub level: String,
    /// Requested format, lowercased. Empty means unset.
    #[serde(default)]
    pub format: String,
    /// Whether the human-readable profile uses ANSI colors.
    #[serde(default)]
    pub ansi: bool,
}

/// Outcome of interpreting a [`LogConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Effective minimum level.
    pub level: LogLevel,
    /// Effective profile.
    pub profile: Profile,
    /// The level string, if it was set but not recognized.
    pub unknown_level: Option<String>,
    /// The format string, if it was set but not recognized.
    pub unknown_format: Option<String>,
}

impl LogConfig {
    /// Create a config from raw level and format strings.
    #[must_use]
    pub fn new(level: impl AsRef<str>, format: impl AsRef<str>) -> Self {
        Self {
            level: level.as_ref().to_lowercase(),
            format: format.as_ref().to_lowercase(),
            ..Default::default()
        }
    }

    /// Read `GO_LOG` and `GO_LOG_FORMAT` from the process environment.
    ///
    /// Colors are enabled when stderr is a terminal.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
            .with_ansi(std::io::stderr().is_terminal())
    }

    /// Read the level and format variables through `lookup`.
    ///
    /// Missing variables count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(
            lookup(LEVEL_ENV).unwrap_or_default(),
            lookup(FORMAT_ENV).unwrap_or_default(),
        )
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Interpret the raw strings, substituting defaults for unknown values.
    #[must_use]
    pub fn resolve(&self) -> ResolvedConfig {
        let unknown = |raw: &str| (!raw.is_empty()).then(|| raw.to_string());

        let (level, unknown_level) = match self.level.parse::<LogLevel>() {
            Ok(level) => (level, None),
            Err(_) => (LogLevel::Info, unknown(&self.level)),
        };
        let (profile, unknown_format) = match self.format.parse::<LogFormat>() {
            Ok(format) => (format.profile(), None),
            Err(_) => (Profile::Development, unknown(&self.format)),
        };

        ResolvedConfig {
            level,
            profile,
            unknown_level,
            unknown_format,
        }
    }
}

fn production_dispatch(filter: LevelFilter, sink: Sink) -> Dispatch {
    let layer = fmt::layer().event_format(ProductionFormat).with_writer(sink);

    Dispatch::new(tracing_subscriber::registry().with(filter).with(layer))
}

fn development_dispatch(filter: LevelFilter, ansi: bool, sink: Sink) -> Dispatch {
    let layer = fmt::layer()
        .with_writer(sink)
        .with_ansi(ansi)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    Dispatch::new(tracing_subscriber::registry().with(filter).with(layer))
}

/// Build a logger from `config` that writes to `writer`.
///
/// Unknown level or format values are reported as warnings through the
/// returned logger, one per offending value.
///
/// # Errors
///
/// Returns an error if the writer cannot be flushed.
pub fn build_logger<W>(config: &LogConfig, writer: W) -> TelemetryResult<Logger>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let resolved = config.resolve();
    let filter = resolved.level.filter();

    let sink = Sink::new(writer);
    sink.flush().map_err(init_err)?;

    let dispatch = match resolved.profile {
        Profile::Production => production_dispatch(filter, sink.clone()),
        Profile::Development => development_dispatch(filter, config.ansi, sink.clone()),
    };

    let logger = Logger::from_core(Core {
        dispatch,
        sink: Some(sink),
        level: resolved.level,
        profile: resolved.profile,
        caller: resolved.profile == Profile::Production,
        stacktrace_level: STACKTRACE_LEVEL,
    });

    if let Some(level) = resolved.unknown_level {
        logger.warn(
            "unknown log level, falling back to 'info'",
            &[field("level", level)],
        );
    }
    if let Some(format) = resolved.unknown_format {
        logger.warn(
            "unknown log format, falling back to 'human'",
            &[field("format", format)],
        );
    }

    Ok(logger)
}

static ROOT: LazyLock<Logger> = LazyLock::new(|| {
    match build_logger(&LogConfig::from_env(), std::io::stderr) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("fatal: failed to initialize root logger: {e}");
            std::process::exit(1);
        },
    }
});

/// The process-wide root logger.
///
/// Built from the environment on first access; concurrent first accesses
/// share a single construction. If it cannot be built the process exits.
#[must_use]
pub fn root() -> &'static Logger {
    &ROOT
}

/// Flush the root logger, ignoring errors.
///
/// Call once at the end of `main`.
pub fn sync() {
    let _ = root().sync();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Capture;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.level.is_empty());
        assert!(config.format.is_empty());
        assert!(!config.ansi);
        assert!(!LogConfig::new("debug", "human").ansi);
    }

    #[test]
    fn test_log_config_lowercases() {
        let config = LogConfig::new("DEBUG", "Json");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, "json");
    }

    #[test]
    fn test_log_config_from_lookup() {
        let config = LogConfig::from_lookup(|key| match key {
            LEVEL_ENV => Some("WARN".to_string()),
            _ => None,
        });
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, "");
    }

    #[test]
    fn test_log_config_serialization() {
        let config = LogConfig::new("warn", "json").with_ansi(true);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"level\":\"warn\""));
        assert!(json.contains("\"format\":\"json\""));

        let parsed: LogConfig = serde_json::from_str("{\"level\":\"error\"}").unwrap();
        assert_eq!(parsed.level, "error");
        assert!(parsed.format.is_empty());
        assert!(!parsed.ansi);
    }

    #[test]
    fn test_resolve_known_levels() {
        for level in LogLevel::ALL {
            let resolved = LogConfig::new(level.as_str().to_uppercase(), "").resolve();
            assert_eq!(resolved.level, level);
            assert!(resolved.unknown_level.is_none());
        }
    }

    #[test]
    fn test_resolve_unknown_level() {
        let resolved = LogConfig::new("verbose", "").resolve();
        assert_eq!(resolved.level, LogLevel::Info);
        assert_eq!(resolved.unknown_level.as_deref(), Some("verbose"));

        let resolved = LogConfig::new("", "").resolve();
        assert_eq!(resolved.level, LogLevel::Info);
        assert!(resolved.unknown_level.is_none());
    }

    #[test]
    fn test_resolve_formats() {
        assert_eq!(LogConfig::new("", "json").resolve().profile, Profile::Production);
        assert_eq!(LogConfig::new("", "JSON").resolve().profile, Profile::Production);
        assert_eq!(LogConfig::new("", "human").resolve().profile, Profile::Development);
        assert_eq!(LogConfig::new("", "").resolve().profile, Profile::Development);

        let resolved = LogConfig::new("", "xml").resolve();
        assert_eq!(resolved.profile, Profile::Development);
        assert_eq!(resolved.unknown_format.as_deref(), Some("xml"));
    }

    #[test]
    fn test_empty_config_is_quiet_development() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("", ""), capture.clone()).unwrap();

        assert_eq!(logger.level(), LogLevel::Info);
        assert_eq!(logger.profile(), Profile::Development);
        assert!(capture.is_empty());
    }

    #[test]
    fn test_debug_json_is_quiet_production() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("DEBUG", "json"), capture.clone()).unwrap();

        assert_eq!(logger.level(), LogLevel::Debug);
        assert_eq!(logger.profile(), Profile::Production);
        assert!(capture.is_empty());
    }

    #[test]
    fn test_unknown_level_warns_once() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("verbose", "json"), capture.clone()).unwrap();
        assert_eq!(logger.level(), LogLevel::Info);

        let entries = capture.json_lines();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["level"], "WARN");
        assert_eq!(
            entries[0]["message"],
            "unknown log level, falling back to 'info'"
        );
        assert_eq!(entries[0]["field.level"], "verbose");
    }

    #[test]
    fn test_unknown_format_warns_once() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("debug", "XML"), capture.clone()).unwrap();
        assert_eq!(logger.profile(), Profile::Development);

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("unknown log format, falling back to 'human'"));
        assert!(lines[0].contains("format=\"xml\""));
        assert!(!lines[0].contains("caller="));
    }

    #[test]
    fn test_both_warnings_are_independent() {
        let capture = Capture::default();
        build_logger(&LogConfig::new("loud", "yaml"), capture.clone()).unwrap();

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("unknown log level"));
        assert!(lines[0].contains("loud"));
        assert!(lines[1].contains("unknown log format"));
        assert!(lines[1].contains("yaml"));
    }

    #[test]
    fn test_level_threshold_applies() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("warn", "json"), capture.clone()).unwrap();

        logger.debug("hidden", &[]);
        logger.info("hidden", &[]);
        logger.warn("shown", &[]);
        logger.error("shown", &[]);

        let entries = capture.json_lines();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e["message"] == "shown"));
    }

    #[test]
    fn test_fatal_threshold_hides_errors() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("fatal", "json"), capture.clone()).unwrap();

        logger.error("hidden", &[]);
        assert!(capture.is_empty());
        assert!(logger.enabled(LogLevel::Fatal));
        assert!(!logger.enabled(LogLevel::Error));
    }

    #[test]
    fn test_production_entries_carry_caller() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("info", "json"), capture.clone()).unwrap();

        logger
            .named("db")
            .with([field("table", "users")])
            .info("connected", &[field("pool", 4)]);

        let entries = capture.json_lines();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["logger"], "db");
        assert_eq!(entries[0]["table"], "users");
        assert_eq!(entries[0]["pool"], 4);
        let caller = entries[0]["caller"].as_str().unwrap();
        assert!(caller.starts_with(file!()), "caller was {caller}");
    }

    #[test]
    fn test_development_entries_omit_caller() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("info", "human"), capture.clone()).unwrap();

        logger.named("db").info("connected", &[field("pool", 4)]);

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("connected"));
        assert!(lines[0].contains("logger=\"db\""));
        assert!(lines[0].contains("attrs=pool=4"));
        assert!(!lines[0].contains("caller"));
    }

    #[test]
    fn test_stacktrace_only_at_fatal() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("debug", "json"), capture.clone()).unwrap();

        logger.error("plain", &[]);
        logger.log(LogLevel::Fatal, "dying", &[]);

        let entries = capture.json_lines();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["level"], "ERROR");
        assert!(entries[0].get("stacktrace").is_none());
        assert_eq!(entries[1]["level"], "FATAL");
        assert!(entries[1].get("fatal").is_none());
        assert!(entries[1]["stacktrace"].is_string());
    }

    #[test]
    fn test_sync_flushes_sink() {
        let capture = Capture::default();
        let logger = build_logger(&LogConfig::new("", ""), capture.clone()).unwrap();
        assert!(logger.sync().is_ok());
    }

    #[test]
    fn test_unflushable_sink_fails_to_build() {
        struct Closed;

        impl std::io::Write for Closed {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Err(std::io::Error::other("closed"))
            }
        }

        let result = build_logger(&LogConfig::new("", ""), || Closed);
        assert!(matches!(result, Err(TelemetryError::InitError(ref msg)) if msg == "closed"));
    }

    #[test]
    fn test_log_format_serialization() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"human\"").unwrap();
        assert_eq!(parsed, LogFormat::Human);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("human".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default().profile(), Profile::Development);
    }
}
