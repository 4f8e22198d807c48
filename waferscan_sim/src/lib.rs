//! WaferScan Deterministic Simulation Harness
//!
//! This crate drives the scan-cycle controller through complete inspection
//! cycles in a controlled environment. All sources of non-determinism are
//! intercepted: time comes from a manually advanced virtual clock, and the
//! fixture catalog is fixed data, so any run is reproducible bit-for-bit.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     CycleRunner                      │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ SimContext (virtual clock)                     │  │
//! │  └────────────────────────────────────────────────┘  │
//! │       │ sleep() advances          poll(now)          │
//! │  ┌────▼───────────────┐     ┌─────────────────────┐  │
//! │  │ ScanCycleController│────►│ frames + invariant  │  │
//! │  │ (waferscan_core)   │     │ checks -> RunReport │  │
//! │  └────────────────────┘     └─────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use waferscan_sim::{CycleRunner, SimContext, SimRunConfig};
//!
//! let ctx = SimContext::shared();
//! let runner = CycleRunner::new(SimRunConfig { cycles: 4, ..Default::default() });
//! let report = runner.run(ctx.as_ref(), &mut controller).await;
//! assert!(report.passed);
//! ```

mod context;
mod exporter;
mod runner;

pub use context::SimContext;
pub use exporter::{ExportError, RunExport};
pub use runner::{CycleFrame, CycleReport, CycleRunner, RunReport, SimRunConfig};
