//! Error types for leakwatch-detector.
//!
//! Suppressed and deallocated probes are outcomes, not errors. What remains
//! here is what the host has to deal with: its own handler failing or
//! panicking, a probe that never fired, and configuration problems.

use thiserror::Error;

/// Error type a fallible leak handler may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the detector.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The registered leak handler returned an error.
    #[error("leak handler failed: {0}")]
    Handler(#[source] HandlerError),

    /// The registered leak handler panicked.
    #[error("leak handler panicked: {0}")]
    HandlerPanicked(String),

    /// The run loop dropped the probe before it fired.
    #[error("probe dropped before firing")]
    ProbeDropped,

    /// No tokio runtime to drive the default run loop.
    #[error("no tokio runtime available: {0}")]
    Runtime(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for DetectorError {
    fn from(e: toml::de::Error) -> Self {
        DetectorError::Config(e.to_string())
    }
}

/// Result type for detector operations.
pub type DetectorResult<T> = Result<T, DetectorError>;
