//! Zeus Log - context-scoped structured logging.
//!
//! This crate provides:
//! - A process-wide root logger configured from `GO_LOG` and `GO_LOG_FORMAT`
//! - An immutable request [`Context`] that carries a logger down a call chain
//! - Derived contexts whose logger is named, enriched with fields, or silenced
//!
//! # Example
//!
//! ```rust,no_run
//! use zeus_log::{Context, field, scope};
//!
//! fn handle(ctx: &Context) {
//!     let ctx = scope::with_fields(ctx, [field("user", "alice")]);
//!     scope::logger(&ctx).info("loading profile", &[]);
//! }
//!
//! let ctx = scope::with_name(&Context::background(), "api");
//! handle(&ctx);
//!
//! // Flush buffered entries before exiting.
//! zeus_log::sync();
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod scope;

mod context;
mod error;
mod format;
mod logger;
mod logging;
#[cfg(test)]
mod testing;

pub use context::{Context, ContextKey};
pub use error::{TelemetryError, TelemetryResult};
pub use logger::{Field, LogLevel, Logger, NAME_SEPARATOR, ParseLevelError, Profile, field};
pub use logging::{
    FORMAT_ENV, LEVEL_ENV, LogConfig, LogFormat, ParseFormatError, ResolvedConfig, build_logger,
    root, sync,
};
pub use scope::ContextLoggerExt;
