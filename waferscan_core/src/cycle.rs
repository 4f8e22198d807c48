//! Scan Cycle Controller: the timer-driven progress/reveal state machine.
//!
//! The controller owns all mutable simulation state and advances it from
//! deadlines measured against an injected clock. A driver loop (production
//! timers or a virtual clock) calls [`ScanCycleController::poll`] with the
//! current time; the controller fires every deadline due at or before that
//! instant, so a virtual clock may jump arbitrarily far in one step.
//!
//! # State machine
//!
//! ```text
//!          start()               progress >= 100          reveal delay
//! Idle ──────────────► Scanning ────────────────► Revealing ──────► Complete
//!  ▲                      │                           │                │
//!  └──────── reset() ─────┴───────── reset() ─────────┴──── reset() ───┘
//! ```
//!
//! `reset()` cancels any pending deadline totally: a cancelled tick or
//! reveal has no later observable effect.

use crate::fixtures::{DefectRecord, FixtureCatalog};
use crate::metrics::compute_yield;
use std::time::Duration;
use tracing::{debug, info};

/// Period of the progress tick while scanning.
pub const TICK_PERIOD: Duration = Duration::from_millis(25);

/// Progress (and elapsed-ms) increment per tick.
pub const PROGRESS_STEP: u8 = 2;

/// Delay between progress reaching 100 and the defect reveal.
pub const REVEAL_DELAY: Duration = Duration::from_millis(500);

/// Initial cumulative yield rate displayed before any wafer completes.
const INITIAL_YIELD_RATE: f64 = 98.5;

/// Lifecycle phase of the current scan cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No scan in progress, nothing revealed for the current wafer.
    Idle,
    /// Progress strictly increasing on each tick.
    Scanning,
    /// Progress pinned at 100, waiting out the reveal delay.
    Revealing,
    /// Defects revealed, counters updated.
    Complete,
}

/// Mutable simulation state, single-owner (the controller).
///
/// The renderer and metrics engine only ever borrow this.
#[derive(Clone, Debug)]
pub struct CycleState {
    /// Current wafer id, 1..=N; wraps to 1 after the last fixture.
    pub current_wafer_id: u32,
    /// True exactly while a scan is in progress (Scanning or Revealing).
    pub running: bool,
    /// Scan progress percentage, 0..=100, monotone while running.
    pub progress: u8,
    /// Virtual elapsed milliseconds, reset together with `progress`.
    pub elapsed_ms: u64,
    /// Empty until the cycle completes, then the fixture's full defect list.
    pub revealed_defects: Vec<DefectRecord>,
    /// Yield of the most recently completed wafer; 85.0..=98.5 by construction.
    pub cumulative_yield_rate: f64,
    /// Running total of completed cycles. Never decremented or reset.
    pub cumulative_wafers_processed: u64,
}

/// Which transition the pending deadline drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PendingTimer {
    Tick,
    Reveal,
}

#[derive(Clone, Copy, Debug)]
struct Deadline {
    due: Duration,
    timer: PendingTimer,
}

/// Owns the cycle state and drives all transitions.
pub struct ScanCycleController {
    catalog: FixtureCatalog,
    state: CycleState,
    phase: Phase,
    /// At most one deadline is pending at a time; `None` cancels everything.
    deadline: Option<Deadline>,
}

impl ScanCycleController {
    /// Creates a controller in `Idle` on wafer 1.
    pub fn new(catalog: FixtureCatalog) -> Self {
        Self {
            catalog,
            state: CycleState {
                current_wafer_id: 1,
                running: false,
                progress: 0,
                elapsed_ms: 0,
                revealed_defects: Vec::new(),
                cumulative_yield_rate: INITIAL_YIELD_RATE,
                cumulative_wafers_processed: 0,
            },
            phase: Phase::Idle,
            deadline: None,
        }
    }

    /// Current simulation state, for the renderer and summary panel.
    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The fixture catalog this controller cycles over.
    pub fn catalog(&self) -> &FixtureCatalog {
        &self.catalog
    }

    /// Due time of the pending tick or reveal, if any. Drivers use this to
    /// decide how long to sleep.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.deadline.map(|d| d.due)
    }

    /// Begins a scan of the current wafer.
    ///
    /// Allowed only from `Idle` or `Complete`; a redundant call while a
    /// cycle is already running is silently ignored, so overlapping starts
    /// can never drive two tick sources against the same state.
    pub fn start(&mut self, now: Duration) {
        match self.phase {
            Phase::Idle | Phase::Complete => {
                self.state.revealed_defects.clear();
                self.state.progress = 0;
                self.state.elapsed_ms = 0;
                self.state.running = true;
                self.phase = Phase::Scanning;
                self.deadline = Some(Deadline {
                    due: now + TICK_PERIOD,
                    timer: PendingTimer::Tick,
                });
                debug!(wafer = self.state.current_wafer_id, "scan started");
            }
            Phase::Scanning | Phase::Revealing => {
                debug!(
                    wafer = self.state.current_wafer_id,
                    "start ignored, scan already in progress"
                );
            }
        }
    }

    /// Advances to the next wafer and returns to `Idle`.
    ///
    /// Allowed in any state. Cancels the pending deadline before mutating,
    /// so a stale tick or reveal can never touch state it no longer owns.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.state.running = false;
        self.state.progress = 0;
        self.state.elapsed_ms = 0;
        self.state.revealed_defects.clear();
        self.state.current_wafer_id = self.catalog.next_id(self.state.current_wafer_id);
        self.phase = Phase::Idle;
        debug!(wafer = self.state.current_wafer_id, "reset to idle");
    }

    /// Fires every deadline due at or before `now`.
    ///
    /// Each fired tick schedules its successor relative to its own due time,
    /// so a large jump of the clock replays the exact tick sequence a
    /// real-time driver would have produced.
    pub fn poll(&mut self, now: Duration) {
        while let Some(deadline) = self.deadline {
            if now < deadline.due {
                break;
            }
            self.deadline = None;
            match deadline.timer {
                PendingTimer::Tick => self.on_tick(deadline.due),
                PendingTimer::Reveal => self.on_reveal(),
            }
        }
    }

    fn on_tick(&mut self, due: Duration) {
        self.state.progress = self.state.progress.saturating_add(PROGRESS_STEP).min(100);
        self.state.elapsed_ms += PROGRESS_STEP as u64;

        if self.state.progress >= 100 {
            self.phase = Phase::Revealing;
            self.deadline = Some(Deadline {
                due: due + REVEAL_DELAY,
                timer: PendingTimer::Reveal,
            });
            debug!(wafer = self.state.current_wafer_id, "scan sweep complete");
        } else {
            self.deadline = Some(Deadline {
                due: due + TICK_PERIOD,
                timer: PendingTimer::Tick,
            });
        }
    }

    fn on_reveal(&mut self) {
        // Out-of-range ids degrade to the first fixture, never fail.
        let fixture = self.catalog.get(self.state.current_wafer_id);
        self.state.revealed_defects = fixture.defects.clone();
        self.state.running = false;
        self.state.cumulative_wafers_processed += 1;
        self.state.cumulative_yield_rate = compute_yield(&self.state.revealed_defects);
        self.phase = Phase::Complete;
        info!(
            wafer = self.state.current_wafer_id,
            defects = self.state.revealed_defects.len(),
            yield_rate = self.state.cumulative_yield_rate,
            processed = self.state.cumulative_wafers_processed,
            "scan cycle complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureCatalog;
    use proptest::prelude::*;

    fn controller() -> ScanCycleController {
        ScanCycleController::new(FixtureCatalog::builtin())
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Drives one full cycle to Complete, starting at `start` ms.
    fn run_to_complete(c: &mut ScanCycleController, start: u64) -> u64 {
        c.start(ms(start));
        let mut now = start;
        while c.phase() != Phase::Complete {
            now += 25;
            c.poll(ms(now));
            assert!(now < start + 60_000, "cycle did not complete");
        }
        now
    }

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.phase(), Phase::Idle);
        let s = c.state();
        assert_eq!(s.current_wafer_id, 1);
        assert!(!s.running);
        assert_eq!(s.progress, 0);
        assert_eq!(s.cumulative_yield_rate, 98.5);
        assert_eq!(s.cumulative_wafers_processed, 0);
    }

    #[test]
    fn test_ticks_advance_progress_and_elapsed_together() {
        let mut c = controller();
        c.start(ms(0));
        assert_eq!(c.phase(), Phase::Scanning);
        assert!(c.state().running);

        c.poll(ms(25));
        assert_eq!(c.state().progress, 2);
        assert_eq!(c.state().elapsed_ms, 2);

        c.poll(ms(100));
        assert_eq!(c.state().progress, 8);
        assert_eq!(c.state().elapsed_ms, 8);
    }

    #[test]
    fn test_full_cycle_reveals_atomically() {
        let mut c = controller();
        c.start(ms(0));

        // 50 ticks take progress to 100: last tick due at 50 * 25 = 1250ms
        let mut now = 0;
        while c.phase() == Phase::Scanning {
            now += 25;
            c.poll(ms(now));
            // Reveal atomicity: nothing revealed before Complete
            assert!(c.state().revealed_defects.is_empty());
        }
        assert_eq!(c.phase(), Phase::Revealing);
        assert_eq!(c.state().progress, 100);
        assert!(c.state().running, "running stays true through Revealing");
        assert_eq!(now, 1250);

        // Just before the reveal delay elapses: still nothing
        c.poll(ms(now + 499));
        assert_eq!(c.phase(), Phase::Revealing);
        assert!(c.state().revealed_defects.is_empty());

        // At the deadline the full fixture list lands in one step
        c.poll(ms(now + 500));
        assert_eq!(c.phase(), Phase::Complete);
        let s = c.state();
        assert!(!s.running);
        assert_eq!(s.revealed_defects.len(), 3);
        assert_eq!(s.cumulative_wafers_processed, 1);
        assert_eq!(s.cumulative_yield_rate, 96.5);
        assert_eq!(s.elapsed_ms, 100);
    }

    #[test]
    fn test_large_clock_jump_replays_ticks() {
        let mut c = controller();
        c.start(ms(0));
        // One poll far in the future drives the whole cycle
        c.poll(ms(10_000));
        assert_eq!(c.phase(), Phase::Complete);
        assert_eq!(c.state().progress, 100);
        assert_eq!(c.state().cumulative_wafers_processed, 1);
    }

    #[test]
    fn test_idempotent_start() {
        let mut c = controller();
        c.start(ms(0));
        c.poll(ms(50));
        let progress_before = c.state().progress;

        // Redundant start is a silent no-op: no state reset, no second timer
        c.start(ms(50));
        assert_eq!(c.state().progress, progress_before);
        assert_eq!(c.phase(), Phase::Scanning);

        run_to_complete_from(&mut c, 50);
        assert_eq!(c.state().cumulative_wafers_processed, 1);
        // Exactly one tick chain ran: elapsed matches 50 ticks
        assert_eq!(c.state().elapsed_ms, 100);
    }

    fn run_to_complete_from(c: &mut ScanCycleController, start: u64) -> u64 {
        let mut now = start;
        while c.phase() != Phase::Complete {
            now += 25;
            c.poll(ms(now));
            assert!(now < start + 60_000, "cycle did not complete");
        }
        now
    }

    #[test]
    fn test_reset_mid_scan_cancels_pending_reveal() {
        let mut c = controller();
        c.start(ms(0));
        c.poll(ms(500));
        assert_eq!(c.phase(), Phase::Scanning);

        c.reset();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().current_wafer_id, 2);
        assert_eq!(c.state().progress, 0);
        assert_eq!(c.state().elapsed_ms, 0);
        assert!(c.next_deadline().is_none());

        // Cancellation is total: later polls have no observable effect
        c.poll(ms(60_000));
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.state().revealed_defects.is_empty());
        assert_eq!(c.state().cumulative_wafers_processed, 0);
    }

    #[test]
    fn test_reset_between_sweep_and_reveal() {
        let mut c = controller();
        c.start(ms(0));
        c.poll(ms(1250));
        assert_eq!(c.phase(), Phase::Revealing);

        // Reset before the reveal delay elapses: the old wafer's defects
        // never land and the processed counter is untouched.
        c.reset();
        c.poll(ms(60_000));
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().current_wafer_id, 2);
        assert!(c.state().revealed_defects.is_empty());
        assert_eq!(c.state().cumulative_wafers_processed, 0);
    }

    #[test]
    fn test_wrap_around_over_catalog() {
        let mut c = controller();
        let n = c.catalog().len();
        for _ in 0..n {
            c.reset();
        }
        assert_eq!(c.state().current_wafer_id, 1);
    }

    #[test]
    fn test_consecutive_cycles_accumulate_processed_count() {
        let mut c = controller();
        let mut now = 0;
        for expected in 1..=4u64 {
            now = run_to_complete(&mut c, now) + 25;
            assert_eq!(c.state().cumulative_wafers_processed, expected);
            c.reset();
        }
        // Yield was overwritten by the last wafer (wafer 4: one critical)
        // 98 - 2 - 0.5 = 95.5
        assert_eq!(c.state().cumulative_yield_rate, 95.5);
        assert_eq!(c.state().current_wafer_id, 1);
    }

    #[test]
    fn test_yield_overwritten_per_cycle() {
        let mut c = controller();
        let end = run_to_complete(&mut c, 0);
        assert_eq!(c.state().cumulative_yield_rate, 96.5);

        c.reset();
        run_to_complete(&mut c, end + 25);
        // Wafer 2 replaces, not averages with, wafer 1's rate
        assert_eq!(c.state().cumulative_yield_rate, 95.0);
    }

    #[test]
    fn test_start_clears_previous_reveal() {
        let mut c = controller();
        let end = run_to_complete(&mut c, 0);
        assert!(!c.state().revealed_defects.is_empty());

        // Restarting the same wafer clears revealed defects with the counters
        c.start(ms(end + 25));
        assert!(c.state().revealed_defects.is_empty());
        assert_eq!(c.state().progress, 0);
        assert_eq!(c.state().elapsed_ms, 0);
    }

    proptest! {
        #[test]
        fn progress_monotone_and_bounded(deltas in proptest::collection::vec(1u64..200, 1..200)) {
            let mut c = controller();
            c.start(ms(0));

            let mut now = 0;
            let mut last_progress = 0u8;
            for delta in deltas {
                now += delta;
                c.poll(ms(now));
                let p = c.state().progress;
                prop_assert!(p >= last_progress);
                prop_assert!(p <= 100);
                if c.state().running && c.phase() == Phase::Scanning {
                    prop_assert!(c.state().revealed_defects.is_empty());
                }
                last_progress = p;
            }
        }

        #[test]
        fn reset_is_safe_at_any_point(stop_at in 0u64..2000) {
            let mut c = controller();
            c.start(ms(0));
            c.poll(ms(stop_at));
            c.reset();

            prop_assert_eq!(c.phase(), Phase::Idle);
            prop_assert_eq!(c.state().progress, 0);
            prop_assert!(c.state().revealed_defects.is_empty());
            prop_assert!(c.next_deadline().is_none());
        }
    }
}
