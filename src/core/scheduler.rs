//! Periodic cycle scheduling
//!
//! A single timer thread fires on a fixed interval and hands every firing to
//! a short-lived worker thread. The worker runs one guarded cycle:
//! - at most one cycle is in flight at any time
//! - a firing that finds a cycle running is skipped, never queued
//! - cycle errors and panics are logged and counted, the schedule goes on

use crate::error::{Result, SyncError};
use crate::sync::{CycleReport, ReconciliationEngine};
use crossbeam::channel::{bounded, select, tick, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Something that can run one synchronization cycle
pub trait CycleRunner: Send + Sync {
    /// Run a full cycle, failing only on cycle-level errors
    fn run_cycle(&self) -> Result<CycleReport>;
}

impl CycleRunner for ReconciliationEngine {
    fn run_cycle(&self) -> Result<CycleReport> {
        self.run_once()
    }
}

/// Result of one firing
#[derive(Debug)]
pub enum CycleOutcome {
    /// The cycle ran to the end (items may still have failed)
    Completed(CycleReport),
    /// The cycle aborted with an error or panicked
    Failed(SyncError),
    /// Another cycle was still in progress
    Skipped,
}

/// Scheduler statistics
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Cycles that ran to the end
    pub cycles_completed: AtomicU64,
    /// Cycles that aborted
    pub cycles_failed: AtomicU64,
    /// Firings skipped because a cycle was in progress
    pub cycles_skipped: AtomicU64,
}

impl SchedulerStats {
    /// Cycles completed so far
    pub fn completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Cycles failed so far
    pub fn failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    /// Firings skipped so far
    pub fn skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::Relaxed)
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No periodic trigger
    Stopped,
    /// Timer running
    Scheduled,
}

/// "Cycle in progress" flag
#[derive(Debug, Default)]
struct CycleGuard {
    running: AtomicBool,
}

impl CycleGuard {
    fn try_acquire(&self) -> Option<CycleToken<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleToken { flag: &self.running })
    }

    fn is_held(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the flag when the cycle ends, however it ends
struct CycleToken<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CycleToken<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct Shared {
    runner: Arc<dyn CycleRunner>,
    guard: CycleGuard,
    stats: SchedulerStats,
}

impl Shared {
    fn trigger(&self) -> CycleOutcome {
        let Some(_token) = self.guard.try_acquire() else {
            warn!("Skipping synchronization cycle, previous one still in progress");
            self.stats.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            return CycleOutcome::Skipped;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.runner.run_cycle()))
            .unwrap_or_else(|payload| Err(SyncError::Scheduler(panic_message(payload.as_ref()))));

        match result {
            Ok(report) => {
                self.stats.cycles_completed.fetch_add(1, Ordering::Relaxed);
                info!("Synchronization finished. Waiting for next round");
                CycleOutcome::Completed(report)
            }
            Err(e) => {
                self.stats.cycles_failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Synchronization cycle failed");
                CycleOutcome::Failed(e)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("cycle panicked: {}", detail)
}

struct Timer {
    shutdown: Sender<()>,
    thread: JoinHandle<Vec<JoinHandle<()>>>,
}

/// Runs a [`CycleRunner`] on a fixed interval
pub struct CycleScheduler {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Option<Timer>,
    in_flight: Vec<JoinHandle<()>>,
}

impl CycleScheduler {
    /// Create a stopped scheduler
    pub fn new(runner: Arc<dyn CycleRunner>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                runner,
                guard: CycleGuard::default(),
                stats: SchedulerStats::default(),
            }),
            interval,
            timer: None,
            in_flight: Vec::new(),
        }
    }

    /// Period between firings
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Statistics
    pub fn stats(&self) -> &SchedulerStats {
        &self.shared.stats
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        if self.timer.is_some() {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Stopped
        }
    }

    /// Whether the periodic trigger is active
    pub fn is_scheduled(&self) -> bool {
        self.state() == SchedulerState::Scheduled
    }

    /// Whether a cycle is running right now
    pub fn cycle_in_progress(&self) -> bool {
        self.shared.guard.is_held()
    }

    /// Run one guarded cycle on the calling thread
    pub fn trigger(&self) -> CycleOutcome {
        self.shared.trigger()
    }

    /// Fire a cycle now and then every interval. No-op when already scheduled.
    pub fn start(&mut self) -> Result<()> {
        if self.timer.is_some() {
            debug!("Scheduler already running");
            return Ok(());
        }

        let (shutdown, shutdown_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("sync-timer".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                let mut workers = Vec::new();
                spawn_cycle(&shared, &mut workers);

                loop {
                    select! {
                        recv(ticker) -> _ => spawn_cycle(&shared, &mut workers),
                        recv(shutdown_rx) -> _ => break,
                    }
                    workers.retain(|worker| !worker.is_finished());
                }

                workers
            })
            .map_err(|e| SyncError::Scheduler(format!("failed to start timer thread: {}", e)))?;

        self.timer = Some(Timer { shutdown, thread });
        info!(
            interval = %humantime::format_duration(self.interval),
            "Synchronization scheduled"
        );
        Ok(())
    }

    /// Cancel the periodic trigger. A cycle already running is left to finish.
    pub fn stop(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };

        let _ = timer.shutdown.send(());
        match timer.thread.join() {
            Ok(workers) => self.in_flight.extend(workers),
            Err(_) => error!("Timer thread panicked"),
        }
        info!("Synchronization stopped");
    }

    /// Block until every cycle started by the timer has returned
    pub fn wait_for_in_flight(&mut self) {
        for worker in self.in_flight.drain(..) {
            if worker.join().is_err() {
                error!("Cycle worker thread panicked");
            }
        }
    }
}

impl Drop for CycleScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_cycle(shared: &Arc<Shared>, workers: &mut Vec<JoinHandle<()>>) {
    let shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("sync-cycle".to_string())
        .spawn(move || {
            shared.trigger();
        });

    match spawned {
        Ok(worker) => workers.push(worker),
        Err(e) => error!(error = %e, "Failed to start cycle thread"),
    }
}
