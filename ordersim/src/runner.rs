//! Fixed-cadence driver standing in for the external scheduler.
//!
//! Each tick runs one engine invocation. A failed invocation is logged and
//! counted; it never stops the loop. Ticks that would pile up behind a slow
//! invocation are skipped rather than burst.

use std::sync::Arc;
use std::time::Duration;

use nutype::nutype;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::ClockStore;
use crate::engine::SimulationEngine;
use crate::inventory::InventoryStore;
use crate::sink::EventSink;

/// Time between two invocations, in milliseconds.
#[nutype(
    validate(greater_or_equal = 1),
    default = 60_000,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Display,
        Default,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct TickPeriodMs(u64);

impl TickPeriodMs {
    /// Converts to a `Duration`.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into_inner())
    }
}

/// What a runner did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerReport {
    /// Invocations started.
    pub ticks: u64,
    /// Invocations that returned a summary.
    pub succeeded: u64,
    /// Invocations aborted by a fatal error.
    pub failed: u64,
}

/// Drives a shared engine on a fixed cadence.
#[derive(Debug)]
pub struct SimulationRunner<I, C, S> {
    engine: Arc<SimulationEngine<I, C, S>>,
    period: TickPeriodMs,
    max_ticks: Option<u64>,
}

impl<I, C, S> SimulationRunner<I, C, S>
where
    I: InventoryStore,
    C: ClockStore,
    S: EventSink,
{
    /// Creates a runner ticking every `period`, with no tick limit.
    pub const fn new(engine: Arc<SimulationEngine<I, C, S>>, period: TickPeriodMs) -> Self {
        Self {
            engine,
            period,
            max_ticks: None,
        }
    }

    /// Stops on its own after `max_ticks` invocations.
    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// The driven engine.
    pub const fn engine(&self) -> &Arc<SimulationEngine<I, C, S>> {
        &self.engine
    }

    /// Ticks until `shutdown` turns `true`, its sender is dropped, or the
    /// tick limit is reached. The first tick fires immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> RunnerReport {
        let mut report = RunnerReport::default();
        let mut ticker = interval(self.period.as_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(period_ms = %self.period, max_ticks = ?self.max_ticks, "simulation runner started");

        while !*shutdown.borrow() && !self.max_ticks.is_some_and(|max| report.ticks >= max) {
            tokio::select! {
                _ = ticker.tick() => {
                    report.ticks += 1;
                    match self.engine.run_once().await {
                        Ok(summary) => {
                            report.succeeded += 1;
                            debug!(
                                tick = report.ticks,
                                body = %summary.to_response_body(),
                                "tick complete"
                            );
                        }
                        Err(err) => {
                            report.failed += 1;
                            warn!(tick = report.ticks, error = %err, "tick failed, continuing");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        info!(
            ticks = report.ticks,
            succeeded = report.succeeded,
            failed = report.failed,
            "simulation runner stopped"
        );
        report
    }
}

impl<I, C, S> SimulationRunner<I, C, S>
where
    I: InventoryStore + 'static,
    C: ClockStore + 'static,
    S: EventSink + 'static,
{
    /// Runs on a background task.
    pub fn spawn(self) -> RunnerHandle {
        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(shutdown).await });
        RunnerHandle { stop, task }
    }
}

/// Control over a spawned runner.
#[derive(Debug)]
pub struct RunnerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<RunnerReport>,
}

impl RunnerHandle {
    /// Whether the runner has stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals shutdown and waits for the in-flight invocation to finish.
    pub async fn stop(self) -> Result<RunnerReport, JoinError> {
        self.stop.send_replace(true);
        self.task.await
    }

    /// Waits for a runner with a tick limit to finish on its own.
    pub async fn join(self) -> Result<RunnerReport, JoinError> {
        self.task.await
    }
}
