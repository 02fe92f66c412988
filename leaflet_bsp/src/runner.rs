//! Fixed-period bus cycle loop.
//!
//! Each cycle calls `on_before_cycle` (presence refresh, configuration-mode
//! exit check) then `on_execute_write` (staged protected writes) and sleeps
//! for the rest of the period. The loop stops when the shared running flag
//! is cleared (ctrl-c) or after a fixed number of cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core::LeafletCore;

/// Timing statistics for loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Cycles executed.
    pub cycle_count: u64,
    /// Cycles that took longer than the period.
    pub timing_violations: u64,
    /// Longest observed cycle.
    pub max_cycle_time_us: u64,
    /// Sum of cycle times, for the average.
    pub total_cycle_time_us: u64,
}

impl TimingStats {
    /// Mean cycle time, 0 before the first cycle.
    pub fn average_cycle_time_us(&self) -> u64 {
        self.total_cycle_time_us
            .checked_div(self.cycle_count)
            .unwrap_or(0)
    }

    fn record(&mut self, cycle_time_us: u64, period_us: u64) {
        self.cycle_count += 1;
        self.total_cycle_time_us += cycle_time_us;
        self.max_cycle_time_us = self.max_cycle_time_us.max(cycle_time_us);
        if cycle_time_us > period_us {
            self.timing_violations += 1;
            if self.timing_violations <= 10 || self.timing_violations % 1000 == 0 {
                warn!(
                    "Timing violation #{}: cycle took {}us (period {}us)",
                    self.timing_violations, cycle_time_us, period_us
                );
            }
        }
    }
}

/// Drives one board's cyclic entry points.
pub struct CycleRunner {
    core: Arc<LeafletCore>,
    period: Duration,
    running: Arc<AtomicBool>,
    stats: TimingStats,
}

impl CycleRunner {
    /// Runner with the given cycle period.
    pub fn new(core: Arc<LeafletCore>, period: Duration) -> Self {
        Self {
            core,
            period,
            running: Arc::new(AtomicBool::new(false)),
            stats: TimingStats::default(),
        }
    }

    /// Flag for signal handlers; storing `false` stops the loop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Statistics collected so far.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }

    /// Execute exactly one cycle without sleeping.
    pub fn cycle_once(&mut self) {
        let start = Instant::now();
        self.core.on_before_cycle();
        self.core.on_execute_write();
        let elapsed_us = start.elapsed().as_micros() as u64;
        self.stats.record(elapsed_us, self.period.as_micros() as u64);
    }

    /// Run until the running flag is cleared or `max_cycles` cycles ran.
    pub fn run(&mut self, max_cycles: Option<u64>) {
        info!(
            "Starting bus cycle loop for board '{}' (period={}ms)",
            self.core.id(),
            self.period.as_millis()
        );
        self.running.store(true, Ordering::SeqCst);

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        while self.running.load(Ordering::SeqCst) {
            if max_cycles.is_some_and(|max| self.stats.cycle_count >= max) {
                break;
            }

            let cycle_start = Instant::now();
            self.cycle_once();

            if self.stats.cycle_count % 100 == 0 {
                debug!(
                    "Cycle loop: {} cycles, avg={}us, max={}us, violations={}",
                    self.stats.cycle_count,
                    self.stats.average_cycle_time_us(),
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations
                );
                self.core.debug_log();
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            "Bus cycle loop stopped after {} cycles (violations: {})",
            self.stats.cycle_count, self.stats.timing_violations
        );
    }
}

/// Whether the process runs under a real-time scheduling policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler only reads the calling process's policy.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
