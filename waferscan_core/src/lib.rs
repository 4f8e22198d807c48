//! WaferScan Core - Wafer-Inspection Scan-Cycle Simulation
//!
//! This library implements the reproducible core of the inspection dashboard:
//! 1. **Fixture Catalog**: immutable canned wafers with defect descriptors
//! 2. **Scan Cycle Controller**: the timer-driven progress/reveal state machine
//! 3. **Metrics Engine**: pure yield-rate derivation per completed cycle
//! 4. **Schematic Renderer**: pure projection from cycle state to draw commands

pub mod cycle;
pub mod fixtures;
pub mod metrics;
pub mod render;

#[cfg(feature = "dashboard")]
pub mod dashboard;

// Re-export key types for convenience
pub use cycle::{CycleState, Phase, ScanCycleController, PROGRESS_STEP, REVEAL_DELAY, TICK_PERIOD};
pub use fixtures::{
    CatalogError, DefectCategory, DefectRecord, FixtureCatalog, Severity, WaferFixture,
};
pub use metrics::{compute_yield, InspectionSummary};
pub use render::{render_schematic, DrawCommand, DrawSurface, RenderView, SurfaceSpec};
