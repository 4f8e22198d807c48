//! Core environment context trait for WaferScan drivers.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// This trait abstracts the clock so that the scan-cycle controller can run
/// in both production (tokio) and simulation (virtual clock) environments.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `Instant` and `tokio::time`
/// - **Simulation**: `SimContext` - a manually advanced virtual clock
///
/// # Determinism
///
/// The controller itself is a pure state machine over `now()` values; the
/// only source of non-determinism is the context implementation.
#[async_trait]
pub trait InspectionContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for tick and reveal deadlines. In simulation, this is the
    /// virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);
}
