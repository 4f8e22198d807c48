//! WaferScan Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the WaferScan
//! scan-cycle controller to run in both **Production** (tokio timers) and
//! **Simulation** (virtual clock) environments.
//!
//! # Core Concept
//!
//! The controller never touches a wall clock directly. All time comes
//! through an [`InspectionContext`]:
//! - Production: `TokioContext` - real `Instant` + `tokio::time::sleep`
//! - Simulation: `SimContext` (in `waferscan_sim`) - a manually advanced
//!   virtual clock
//!
//! Because the controller only reacts to `now()` values handed to it by a
//! driver loop, tests can advance time arbitrarily fast and every run with
//! the same inputs is bit-for-bit reproducible.
//!
//! # Example
//!
//! ```ignore
//! use waferscan_env::InspectionContext;
//!
//! async fn drive<Ctx: InspectionContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(25)).await;
//!         controller.poll(ctx.now());
//!     }
//! }
//! ```

mod context;
mod error;
mod tokio_impl;

pub use context::InspectionContext;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
