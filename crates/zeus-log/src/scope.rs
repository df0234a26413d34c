//! Loggers carried by a [`Context`].
//!
//! Code deep in a call chain asks the context for its logger instead of
//! taking one as a parameter. Callers enrich the logger on the way down by
//! deriving new contexts:
//!
//! ```rust
//! use zeus_log::{Context, field, scope};
//!
//! let ctx = scope::with_name(&Context::background(), "server");
//! let ctx = scope::with_fields(&ctx, [field("request_id", "8f2c")]);
//!
//! scope::logger(&ctx).info("handling request", &[]);
//! ```

use crate::context::{Context, ContextKey};
use crate::logger::{Field, Logger};
use crate::logging::root;

/// Private slot for the context logger.
struct LoggerKey;

impl ContextKey for LoggerKey {
    type Value = Logger;
}

/// The logger attached to `ctx`, or the root logger if there is none.
#[must_use]
pub fn logger(ctx: &Context) -> Logger {
    ctx.value::<LoggerKey>()
        .cloned()
        .unwrap_or_else(|| root().clone())
}

/// Derive a context carrying `logger`.
///
/// Prefer [`with_name`] and [`with_fields`], which build on the logger that
/// is already in scope. This is for loggers that are not derived from it,
/// such as a capturing logger in a test.
#[must_use]
pub fn with_logger(ctx: &Context, logger: Logger) -> Context {
    ctx.with_value::<LoggerKey>(logger)
}

/// Derive a context whose logger name is suffixed with `name`.
#[must_use]
pub fn with_name(ctx: &Context, name: &str) -> Context {
    with_logger(ctx, logger(ctx).named(name))
}

/// Derive a context whose logger attaches `fields` to every entry.
#[must_use]
pub fn with_fields(ctx: &Context, fields: impl IntoIterator<Item = Field>) -> Context {
    with_logger(ctx, logger(ctx).with(fields))
}

/// Derive a context whose logger discards everything.
#[must_use]
pub fn with_nop_logger(ctx: &Context) -> Context {
    with_logger(ctx, Logger::nop())
}

/// Method syntax for the functions in this module.
pub trait ContextLoggerExt {
    /// See [`logger`].
    fn logger(&self) -> Logger;
    /// See [`with_logger`].
    #[must_use]
    fn with_logger(&self, logger: Logger) -> Self;
    /// See [`with_name`].
    #[must_use]
    fn with_name(&self, name: &str) -> Self;
    /// See [`with_fields`].
    #[must_use]
    fn with_fields(&self, fields: impl IntoIterator<Item = Field>) -> Self;
    /// See [`with_nop_logger`].
    #[must_use]
    fn with_nop_logger(&self) -> Self;
}

impl ContextLoggerExt for Context {
    fn logger(&self) -> Logger {
        logger(self)
    }

    fn with_logger(&self, logger: Logger) -> Self {
        with_logger(self, logger)
    }

    fn with_name(&self, name: &str) -> Self {
        with_name(self, name)
    }

    fn with_fields(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        with_fields(self, fields)
    }

    fn with_nop_logger(&self) -> Self {
        with_nop_logger(self)
    }
}
