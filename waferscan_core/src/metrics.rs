//! Metrics engine: pure derivation of yield rate and summary read-outs.
//!
//! Called exactly once per completed cycle; the result replaces (never
//! accumulates into) the controller's cumulative yield rate.

use crate::cycle::CycleState;
use crate::fixtures::{DefectRecord, Severity};
use serde::{Deserialize, Serialize};

/// Baseline yield before defect penalties, in percent.
const BASE_RATE: f64 = 98.0;
/// Penalty per critical defect, in percentage points.
const CRITICAL_PENALTY: f64 = 2.0;
/// Penalty per defect of any severity, in percentage points.
const DEFECT_PENALTY: f64 = 0.5;
/// Floor below which the rate never drops.
const RATE_FLOOR: f64 = 85.0;

/// Derives the yield-rate percentage for a completed wafer.
///
/// ```text
/// rate = max(85, 98 - 2 * critical_count - 0.5 * defect_count)
/// ```
///
/// Deterministic given the same defect list; rounded to one decimal place.
/// The empty list yields exactly 98.0.
pub fn compute_yield(defects: &[DefectRecord]) -> f64 {
    let critical_count = defects
        .iter()
        .filter(|d| d.severity == Severity::Critical)
        .count();

    let rate = BASE_RATE
        - critical_count as f64 * CRITICAL_PENALTY
        - defects.len() as f64 * DEFECT_PENALTY;
    let rate = rate.max(RATE_FLOOR);

    (rate * 10.0).round() / 10.0
}

/// Pure read-out of the cycle state for the summary panel and exporter.
///
/// No independent logic; every field is copied straight from [`CycleState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InspectionSummary {
    pub wafer_id: u32,
    pub elapsed_ms: u64,
    pub defect_count: usize,
    pub yield_rate: f64,
    pub wafers_processed: u64,
}

impl InspectionSummary {
    pub fn from_state(state: &CycleState) -> Self {
        Self {
            wafer_id: state.current_wafer_id,
            elapsed_ms: state.elapsed_ms,
            defect_count: state.revealed_defects.len(),
            yield_rate: state.cumulative_yield_rate,
            wafers_processed: state.cumulative_wafers_processed,
        }
    }
}
