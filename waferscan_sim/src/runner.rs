//! Cycle runner: drives complete inspection cycles and checks invariants.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use waferscan_core::{Phase, ScanCycleController, SurfaceSpec, TICK_PERIOD};
use waferscan_env::InspectionContext;

/// Configuration for a simulation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimRunConfig {
    /// Number of complete scan cycles to drive
    pub cycles: u32,

    /// Record a frame every this many ticks (0 or 1 = every tick)
    pub sample_interval: u32,

    /// Safety cap on ticks per cycle before the run is failed
    pub max_ticks_per_cycle: u64,

    /// Poll interval override in milliseconds. `None` polls at the
    /// controller tick period; coarser values stress the deadline replay.
    #[serde(default)]
    pub tick_period_ms: Option<u64>,

    /// Surface geometry recorded with the run so exported frames can be
    /// re-rendered offline.
    #[serde(default)]
    pub surface: SurfaceSpec,
}

impl Default for SimRunConfig {
    fn default() -> Self {
        Self {
            cycles: 4,
            sample_interval: 5,
            max_ticks_per_cycle: 10_000,
            tick_period_ms: None,
            surface: SurfaceSpec::default(),
        }
    }
}

/// One sampled frame of cycle state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleFrame {
    pub time_ms: u64,
    pub wafer_id: u32,
    pub progress: u8,
    pub running: bool,
    pub revealed_defects: usize,
    pub yield_rate: f64,
    pub wafers_processed: u64,
}

/// Result of one completed cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleReport {
    pub wafer_id: u32,
    pub ticks: u64,
    pub defect_count: usize,
    pub yield_rate: f64,
}

/// Aggregate result of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub cycles: Vec<CycleReport>,
    pub frames: Vec<CycleFrame>,
    pub total_ticks: u64,
    pub final_time_ms: u64,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Drives a controller through complete cycles over any clock.
///
/// The same runner serves deterministic tests (virtual clock, instant) and
/// `--realtime` runs (tokio timers, wall clock) because it only talks to the
/// controller through `poll(ctx.now())` after sleeping the poll interval.
pub struct CycleRunner {
    config: SimRunConfig,
}

impl CycleRunner {
    pub fn new(config: SimRunConfig) -> Self {
        Self { config }
    }

    /// Runs `config.cycles` complete cycles, verifying invariants on the fly:
    /// progress monotonicity, reveal atomicity, and yield bounds. The first
    /// violation fails the run with a reason; the simulation itself never
    /// errors.
    pub async fn run<C: InspectionContext>(
        &self,
        ctx: &C,
        controller: &mut ScanCycleController,
    ) -> RunReport {
        let mut report = RunReport {
            cycles: Vec::new(),
            frames: Vec::new(),
            total_ticks: 0,
            final_time_ms: 0,
            passed: true,
            failure_reason: None,
        };

        let poll_interval = self
            .config
            .tick_period_ms
            .map(Duration::from_millis)
            .unwrap_or(TICK_PERIOD);
        // 0 means "sample every tick", same as 1
        let sample_every = u64::from(self.config.sample_interval.max(1));

        for cycle in 0..self.config.cycles {
            let wafer_id = controller.state().current_wafer_id;
            controller.start(ctx.now());
            debug!(cycle, wafer = wafer_id, "driving cycle");

            let mut ticks: u64 = 0;
            let mut last_progress: u8 = 0;

            while controller.phase() != Phase::Complete {
                ctx.sleep(poll_interval).await;
                controller.poll(ctx.now());
                ticks += 1;
                report.total_ticks += 1;

                let state = controller.state();
                if state.progress < last_progress || state.progress > 100 {
                    self.fail(
                        &mut report,
                        format!(
                            "progress not monotone on wafer {}: {} after {}",
                            wafer_id, state.progress, last_progress
                        ),
                    );
                    return report;
                }
                last_progress = state.progress;

                // Reveal atomicity: nothing visible until the cycle completes
                if controller.phase() != Phase::Complete && !state.revealed_defects.is_empty() {
                    self.fail(
                        &mut report,
                        format!("defects revealed mid-scan on wafer {}", wafer_id),
                    );
                    return report;
                }

                if ticks % sample_every == 0 {
                    report.frames.push(self.frame(ctx, controller));
                }

                if ticks > self.config.max_ticks_per_cycle {
                    self.fail(
                        &mut report,
                        format!("wafer {} did not complete within tick budget", wafer_id),
                    );
                    return report;
                }
            }

            let state = controller.state();
            if !(85.0..=98.0).contains(&state.cumulative_yield_rate) {
                self.fail(
                    &mut report,
                    format!(
                        "yield {} out of bounds on wafer {}",
                        state.cumulative_yield_rate, wafer_id
                    ),
                );
                return report;
            }

            report.frames.push(self.frame(ctx, controller));
            report.cycles.push(CycleReport {
                wafer_id,
                ticks,
                defect_count: state.revealed_defects.len(),
                yield_rate: state.cumulative_yield_rate,
            });

            controller.reset();
        }

        report.final_time_ms = ctx.now().as_millis() as u64;
        report
    }

    fn frame<C: InspectionContext>(
        &self,
        ctx: &C,
        controller: &ScanCycleController,
    ) -> CycleFrame {
        let state = controller.state();
        CycleFrame {
            time_ms: ctx.now().as_millis() as u64,
            wafer_id: state.current_wafer_id,
            progress: state.progress,
            running: state.running,
            revealed_defects: state.revealed_defects.len(),
            yield_rate: state.cumulative_yield_rate,
            wafers_processed: state.cumulative_wafers_processed,
        }
    }

    fn fail(&self, report: &mut RunReport, reason: String) {
        report.passed = false;
        report.failure_reason = Some(reason);
    }
}

/// Expected virtual duration of one cycle: 50 ticks to 100% plus the reveal
/// delay, rounded up to the next tick boundary.
pub fn nominal_cycle_duration() -> Duration {
    Duration::from_millis(25 * 50 + 500)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimContext;
    use proptest::prelude::*;
    use waferscan_core::FixtureCatalog;

    fn controller() -> ScanCycleController {
        ScanCycleController::new(FixtureCatalog::builtin())
    }

    #[tokio::test]
    async fn test_single_cycle_run() {
        let ctx = SimContext::new();
        let mut c = controller();
        let runner = CycleRunner::new(SimRunConfig {
            cycles: 1,
            ..Default::default()
        });

        let report = runner.run(&ctx, &mut c).await;
        assert!(report.passed, "{:?}", report.failure_reason);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].wafer_id, 1);
        assert_eq!(report.cycles[0].defect_count, 3);
        assert_eq!(report.cycles[0].yield_rate, 96.5);
    }

    #[tokio::test]
    async fn test_full_catalog_run_wraps() {
        let ctx = SimContext::new();
        let mut c = controller();
        let runner = CycleRunner::new(SimRunConfig {
            cycles: 4,
            ..Default::default()
        });

        let report = runner.run(&ctx, &mut c).await;
        assert!(report.passed, "{:?}", report.failure_reason);

        let wafer_ids: Vec<u32> = report.cycles.iter().map(|r| r.wafer_id).collect();
        assert_eq!(wafer_ids, vec![1, 2, 3, 4]);
        assert_eq!(c.state().current_wafer_id, 1);
        assert_eq!(c.state().cumulative_wafers_processed, 4);

        let yields: Vec<f64> = report.cycles.iter().map(|r| r.yield_rate).collect();
        assert_eq!(yields, vec![96.5, 95.0, 96.0, 95.5]);
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let runner = CycleRunner::new(SimRunConfig::default());

        let ctx1 = SimContext::new();
        let mut c1 = controller();
        let report1 = runner.run(&ctx1, &mut c1).await;

        let ctx2 = SimContext::new();
        let mut c2 = controller();
        let report2 = runner.run(&ctx2, &mut c2).await;

        assert_eq!(report1.total_ticks, report2.total_ticks);
        assert_eq!(report1.final_time_ms, report2.final_time_ms);
        assert_eq!(report1.frames.len(), report2.frames.len());
        for (a, b) in report1.frames.iter().zip(report2.frames.iter()) {
            assert_eq!(a.time_ms, b.time_ms);
            assert_eq!(a.progress, b.progress);
            assert_eq!(a.yield_rate, b.yield_rate);
        }
    }

    #[tokio::test]
    async fn test_frames_never_show_partial_reveal() {
        let ctx = SimContext::new();
        let mut c = controller();
        let runner = CycleRunner::new(SimRunConfig {
            cycles: 2,
            sample_interval: 1,
            ..Default::default()
        });

        let report = runner.run(&ctx, &mut c).await;
        assert!(report.passed);
        for frame in &report.frames {
            // Either nothing revealed, or the full fixture list
            if frame.revealed_defects > 0 {
                assert!(!frame.running);
            }
        }
    }

    #[tokio::test]
    async fn test_zero_sample_interval_samples_every_tick() {
        let ctx = SimContext::new();
        let mut c = controller();
        let runner = CycleRunner::new(SimRunConfig {
            cycles: 1,
            sample_interval: 0,
            ..Default::default()
        });

        let report = runner.run(&ctx, &mut c).await;
        assert!(report.passed, "{:?}", report.failure_reason);
        // One frame per tick plus the completion frame
        assert_eq!(report.frames.len(), report.cycles[0].ticks as usize + 1);
    }

    #[tokio::test]
    async fn test_coarse_poll_interval_replays_deadlines() {
        let ctx = SimContext::new();
        let mut c = controller();
        let runner = CycleRunner::new(SimRunConfig {
            cycles: 1,
            tick_period_ms: Some(250),
            ..Default::default()
        });

        let report = runner.run(&ctx, &mut c).await;
        assert!(report.passed, "{:?}", report.failure_reason);
        // 1750ms cycle at 250ms polls: 7 polls, same final yield as fine polling
        assert_eq!(report.cycles[0].ticks, 7);
        assert_eq!(report.cycles[0].yield_rate, 96.5);
    }

    #[test]
    fn test_nominal_cycle_duration() {
        assert_eq!(nominal_cycle_duration(), Duration::from_millis(1750));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn runs_deterministic_for_any_config(cycles in 1u32..6, interval in 0u32..8) {
            let runner = CycleRunner::new(SimRunConfig {
                cycles,
                sample_interval: interval,
                ..Default::default()
            });
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            let run = || {
                let ctx = SimContext::new();
                let mut c = controller();
                rt.block_on(runner.run(&ctx, &mut c))
            };
            let report1 = run();
            let report2 = run();

            prop_assert!(report1.passed, "{:?}", report1.failure_reason);
            prop_assert_eq!(report1.total_ticks, report2.total_ticks);
            prop_assert_eq!(report1.final_time_ms, report2.final_time_ms);
            prop_assert_eq!(report1.frames.len(), report2.frames.len());
            for (a, b) in report1.frames.iter().zip(report2.frames.iter()) {
                prop_assert_eq!(a.time_ms, b.time_ms);
                prop_assert_eq!(a.progress, b.progress);
                prop_assert_eq!(a.yield_rate, b.yield_rate);
            }
        }
    }
}
