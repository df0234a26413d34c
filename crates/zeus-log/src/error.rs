//! Logger construction errors.

use thiserror::Error;

/// Errors that can occur while building a logger.
///
/// Only logger construction is fallible. Context accessors never fail and
/// flush errors are reported as plain [`std::io::Error`]s.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The sink could not be opened for writing.
    #[error("failed to build logger: {0}")]
    InitError(String),
}

/// Result type for logger construction.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
