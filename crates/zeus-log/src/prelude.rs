//! Prelude module - commonly used types for convenient import.
//!
//! Use `use zeus_log::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,no_run
//! use zeus_log::prelude::*;
//!
//! let ctx = Context::background()
//!     .with_name("worker")
//!     .with_fields([field("queue", "emails")]);
//!
//! ctx.logger().info("job started", &[field("job_id", 42)]);
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Loggers
pub use crate::{Field, LogLevel, Logger, Profile, field};

// Root logger
pub use crate::{LogConfig, LogFormat, build_logger, root, sync};

// Context
pub use crate::{Context, ContextKey, ContextLoggerExt};
