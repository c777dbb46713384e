//! Run lifecycle: Pending -> Running -> {Completed, Failed}
//!
//! Wraps the stepping function with wall-clock pacing, cancellation,
//! telemetry flushing, the final safety analysis and the three job-tracker
//! signals.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::environment::LightCycling;
use super::safety::{HeatmapConfig, SafetyReport};
use super::scenario::{Scenario, ScenarioError};
use super::stats::RunSummary;
use super::telemetry::{RetryPolicy, TelemetryBuffer, TelemetryMode, TelemetrySink};
use super::types::TICK_SECS;
use super::world::SimWorld;

pub const MIN_DURATION_SECS: f64 = 10.0;
pub const MAX_DURATION_SECS: f64 = 600.0;
pub const MAX_VEHICLES: usize = 20;

/// Simulated time between progress log lines
pub const PROGRESS_EVERY_SECS: f64 = 1.0;

/// Estimated compute cost per simulated second per vehicle
pub const COST_PER_SECOND: f64 = 0.01;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid scenario: {0}")]
    InvalidScenario(#[from] ScenarioError),
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
    #[error("cancelled after {ticks} ticks")]
    Cancelled { ticks: u64 },
    #[error("safety report handoff failed: {0}")]
    ReportHandoff(String),
    #[error("run is already {0:?}")]
    InvalidTransition(RunStatus),
}

impl RunError {
    /// Failure description handed to the job tracker
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// External job tracker; receives exactly the three lifecycle signals
pub trait JobTracker {
    fn running(&mut self);

    fn completed(&mut self, safety_score: f64);

    fn failed(&mut self, reason: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Running,
    Completed { safety_score: f64 },
    Failed { reason: String },
}

/// Remembers every signal it receives
#[derive(Debug, Default)]
pub struct RecordingTracker {
    pub events: Vec<JobEvent>,
}

impl JobTracker for RecordingTracker {
    fn running(&mut self) {
        self.events.push(JobEvent::Running);
    }

    fn completed(&mut self, safety_score: f64) {
        self.events.push(JobEvent::Completed { safety_score });
    }

    fn failed(&mut self, reason: &str) {
        self.events.push(JobEvent::Failed {
            reason: reason.to_string(),
        });
    }
}

/// How the loop relates to wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// One tick per 100 ms of wall time, so observers can follow along
    #[default]
    RealTime,
    /// As fast as possible
    Unpaced,
}

/// Parameters of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub vehicle_count: usize,
    pub duration_secs: f64,
    pub seed: Option<u64>,
    pub pacing: Pacing,
    pub telemetry_mode: TelemetryMode,
    pub light_cycling: LightCycling,
    pub heatmap: HeatmapConfig,
    /// Samples per telemetry flush
    pub flush_batch: usize,
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            vehicle_count: 5,
            duration_secs: 60.0,
            seed: None,
            pacing: Pacing::default(),
            telemetry_mode: TelemetryMode::default(),
            light_cycling: LightCycling::default(),
            heatmap: HeatmapConfig::default(),
            flush_batch: 50,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), RunError> {
        if !(1..=MAX_VEHICLES).contains(&self.vehicle_count) {
            return Err(RunError::InvalidConfig(format!(
                "vehicle count {} is outside 1..={}",
                self.vehicle_count, MAX_VEHICLES
            )));
        }
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&self.duration_secs) {
            return Err(RunError::InvalidConfig(format!(
                "duration {}s is outside {}..={}s",
                self.duration_secs, MIN_DURATION_SECS, MAX_DURATION_SECS
            )));
        }
        if self.heatmap.grid_size == 0
            || self.heatmap.canvas_width <= 0.0
            || self.heatmap.canvas_height <= 0.0
        {
            return Err(RunError::InvalidConfig(
                "heatmap needs a non-empty grid and a positive canvas".to_string(),
            ));
        }
        Ok(())
    }

    /// Rough compute cost of the run, rounded to cents
    pub fn cost_estimate(&self) -> f64 {
        let raw = self.duration_secs * COST_PER_SECOND * self.vehicle_count as f64 * 0.1;
        (raw * 100.0).round() / 100.0
    }
}

/// Shared flag that asks a run to stop between ticks
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a completed run produces
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub report: SafetyReport,
    pub summary: RunSummary,
    /// Samples handed to the sink
    pub samples_flushed: usize,
    /// Samples lost to failed flushes
    pub samples_dropped: usize,
}

/// Keeps the loop in step with the wall clock
struct Pacer {
    start: Instant,
    tick: Duration,
}

impl Pacer {
    fn new(tick_secs: f64) -> Self {
        Self {
            start: Instant::now(),
            tick: Duration::from_secs_f64(tick_secs),
        }
    }

    /// Sleep until `ticks_done` ticks' worth of wall time has passed
    fn wait(&self, ticks_done: u64) {
        let due = self.tick * ticks_done as u32;
        let elapsed = self.start.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }
    }
}

/// One simulation run of a scenario
pub struct SimulationRun {
    scenario: Scenario,
    config: RunConfig,
    status: RunStatus,
    cancel: CancelToken,
    outcome: Option<RunOutcome>,
}

impl SimulationRun {
    pub fn new(scenario: Scenario, config: RunConfig) -> Self {
        Self {
            scenario,
            config,
            status: RunStatus::Pending,
            cancel: CancelToken::default(),
            outcome: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// A handle that can cancel this run from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Run to completion, reporting lifecycle signals to `tracker`.
    ///
    /// A run executes at most once; calling this again returns
    /// `RunError::InvalidTransition` without touching the tracker.
    pub fn execute(
        &mut self,
        sink: &mut dyn TelemetrySink,
        tracker: &mut dyn JobTracker,
    ) -> Result<&RunOutcome, RunError> {
        if self.status != RunStatus::Pending {
            return Err(RunError::InvalidTransition(self.status));
        }

        self.status = RunStatus::Running;
        tracker.running();
        info!(
            "Run started: {} vehicles, {:.0}s, estimated cost {:.2}",
            self.config.vehicle_count,
            self.config.duration_secs,
            self.config.cost_estimate()
        );

        match self.simulate(sink) {
            Ok(outcome) => {
                self.status = RunStatus::Completed;
                tracker.completed(outcome.report.overall_safety_score);
                info!(
                    "Run completed: safety score {:.1}, {} samples",
                    outcome.report.overall_safety_score, outcome.summary.samples
                );
                Ok(&*self.outcome.insert(outcome))
            }
            Err(err) => {
                self.status = RunStatus::Failed;
                error!("Run failed: {}", err);
                tracker.failed(&err.reason());
                Err(err)
            }
        }
    }

    fn simulate(&self, sink: &mut dyn TelemetrySink) -> Result<RunOutcome, RunError> {
        self.config.validate()?;
        self.scenario.validate()?;

        let mut world = match self.config.seed {
            Some(seed) => SimWorld::new_with_seed(
                &self.scenario,
                self.config.vehicle_count,
                self.config.light_cycling,
                self.config.telemetry_mode,
                seed,
            ),
            None => SimWorld::new(
                &self.scenario,
                self.config.vehicle_count,
                self.config.light_cycling,
                self.config.telemetry_mode,
            ),
        };

        let mut buffer = TelemetryBuffer::new(self.config.flush_batch, self.config.retry);
        let total_ticks = SimWorld::ticks_for(self.config.duration_secs);
        let ticks_per_progress = SimWorld::ticks_for(PROGRESS_EVERY_SECS).max(1);
        let pacer = Pacer::new(TICK_SECS);

        while world.ticks < total_ticks {
            if self.cancel.is_cancelled() {
                buffer.flush(sink);
                return Err(RunError::Cancelled { ticks: world.ticks });
            }

            let samples = world.tick();
            buffer.extend(samples, sink);

            if world.ticks % ticks_per_progress == 0 {
                info!(
                    "Progress: {:.0}/{:.0}s simulated",
                    world.time, self.config.duration_secs
                );
            }

            if self.config.pacing == Pacing::RealTime {
                pacer.wait(world.ticks);
            }
        }
        buffer.flush(sink);

        world.log_summary();

        let report = SafetyReport::analyze(
            &world.trace,
            &self.scenario.hazard_positions(),
            self.config.heatmap,
        );

        self.config
            .retry
            .run("Safety report handoff", || sink.write_report(&report))
            .map_err(|err| RunError::ReportHandoff(format!("{:#}", err)))?;

        let summary = world.summary();
        info!(
            "Average speed {:.1} m/s, max {:.1} m/s, {:.0} m travelled, {} collisions",
            summary.average_speed,
            summary.max_speed,
            summary.distance_travelled,
            summary.collisions
        );

        Ok(RunOutcome {
            report,
            summary,
            samples_flushed: buffer.flushed,
            samples_dropped: buffer.dropped,
        })
    }
}
