//! Error types for the WaferScan environment layer.

use thiserror::Error;

/// Errors raised by context drivers.
///
/// The scan-cycle controller itself never errors; these cover the seams
/// where a driver meets the outside world (terminal I/O for the dashboard,
/// missing capabilities at startup).
#[derive(Debug, Error)]
pub enum EnvError {
    /// Terminal setup, draw, or input polling failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The driver could not run against the requested environment.
    #[error("driver error: {0}")]
    Driver(String),
}

impl EnvError {
    /// Creates a driver error.
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }
}
