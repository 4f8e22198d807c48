//! JSON exporter for offline inspection of simulation runs.

use crate::runner::{CycleFrame, CycleReport, RunReport, SimRunConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors writing a run export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Complete simulation export: config, per-cycle results, sampled frames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunExport {
    /// Configuration the run was driven with
    pub config: SimRunConfig,

    /// Per-cycle results
    pub cycles: Vec<CycleReport>,

    /// Sampled frames across the whole run
    pub frames: Vec<CycleFrame>,

    /// Final virtual time in milliseconds
    pub final_time_ms: u64,

    /// Whether all invariants held
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl RunExport {
    /// Builds an export from a finished run.
    pub fn from_report(config: SimRunConfig, report: RunReport) -> Self {
        Self {
            config,
            cycles: report.cycles,
            frames: report.frames,
            final_time_ms: report.final_time_ms,
            passed: report.passed,
            failure_reason: report.failure_reason,
        }
    }

    /// Writes the export to a pretty-printed JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_roundtrip() {
        let export = RunExport {
            config: SimRunConfig::default(),
            cycles: vec![CycleReport {
                wafer_id: 1,
                ticks: 70,
                defect_count: 3,
                yield_rate: 96.5,
            }],
            frames: vec![CycleFrame {
                time_ms: 125,
                wafer_id: 1,
                progress: 10,
                running: true,
                revealed_defects: 0,
                yield_rate: 98.5,
                wafers_processed: 0,
            }],
            final_time_ms: 1750,
            passed: true,
            failure_reason: None,
        };

        let json = serde_json::to_string(&export).unwrap();
        assert!(!json.contains("failure_reason"));

        let back: RunExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cycles[0].yield_rate, 96.5);
        assert_eq!(back.frames.len(), 1);
        assert!(back.passed);
    }
}
