//! Telemetry samples and the sink they are handed to
//!
//! Samples are buffered and flushed in batches. A flush that still fails
//! after retrying is logged and dropped; telemetry is sampled anyway, so
//! losing a batch does not abort the run.

use anyhow::Result;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::driver::SimDriver;
use super::safety::SafetyReport;
use super::types::{Point, VehicleId};

/// Full-lock steering angle reported in telemetry (degrees)
pub const MAX_STEERING_DEGREES: f64 = 45.0;

/// Brake intensity scale used in telemetry
pub const MAX_BRAKE_INTENSITY: f64 = 10.0;

/// One recorded vehicle state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub vehicle_id: VehicleId,
    /// Milliseconds since the start of the run
    pub timestamp_ms: u64,
    pub speed: f64,
    pub acceleration: f64,
    /// 0..10
    pub brake_intensity: f64,
    /// Degrees, -45..45
    pub steering_angle: f64,
    pub position: Point,
}

/// Where the acceleration, brake and steering fields come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryMode {
    /// Derived from what the driver actually did on the sampled tick
    #[default]
    Kinematic,
    /// Uniform noise in the ranges the legacy backend used
    /// (accel -1..1, brake 0..3, steering -10..10). Speed and position stay real.
    Synthetic,
}

impl TelemetrySample {
    /// Sample a driver's current state
    pub fn record<R: Rng>(
        driver: &SimDriver,
        timestamp_ms: u64,
        mode: TelemetryMode,
        rng: &mut R,
    ) -> Self {
        let state = driver.state();
        let (acceleration, brake_intensity, steering_angle) = match mode {
            TelemetryMode::Kinematic => {
                let controls = driver.controls();
                (
                    controls.acceleration,
                    controls.brake_intensity.clamp(0.0, MAX_BRAKE_INTENSITY),
                    (controls.steering * MAX_STEERING_DEGREES)
                        .clamp(-MAX_STEERING_DEGREES, MAX_STEERING_DEGREES),
                )
            }
            TelemetryMode::Synthetic => (
                rng.random_range(-1.0..1.0),
                rng.random_range(0.0..3.0),
                rng.random_range(-10.0..10.0),
            ),
        };

        Self {
            vehicle_id: state.id,
            timestamp_ms,
            speed: state.speed,
            acceleration,
            brake_intensity,
            steering_angle,
            position: state.position,
        }
    }
}

/// External collaborator that persists telemetry and the final report
pub trait TelemetrySink {
    fn write_samples(&mut self, samples: &[TelemetrySample]) -> Result<()>;

    fn write_report(&mut self, report: &SafetyReport) -> Result<()>;
}

/// Keeps everything in memory. Can be told to fail, for exercising the
/// retry paths.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub samples: Vec<TelemetrySample>,
    pub reports: Vec<SafetyReport>,
    /// Number of upcoming `write_samples` calls that should fail
    pub failing_sample_writes: usize,
    /// Number of upcoming `write_report` calls that should fail
    pub failing_report_writes: usize,
    pub batches_written: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for MemorySink {
    fn write_samples(&mut self, samples: &[TelemetrySample]) -> Result<()> {
        if self.failing_sample_writes > 0 {
            self.failing_sample_writes -= 1;
            anyhow::bail!("telemetry store unavailable");
        }
        self.samples.extend_from_slice(samples);
        self.batches_written += 1;
        Ok(())
    }

    fn write_report(&mut self, report: &SafetyReport) -> Result<()> {
        if self.failing_report_writes > 0 {
            self.failing_report_writes -= 1;
            anyhow::bail!("report store unavailable");
        }
        self.reports.push(report.clone());
        Ok(())
    }
}

/// Discards samples after logging them; used by the headless binary
#[derive(Debug, Default)]
pub struct LogSink {
    pub samples_seen: usize,
}

impl TelemetrySink for LogSink {
    fn write_samples(&mut self, samples: &[TelemetrySample]) -> Result<()> {
        self.samples_seen += samples.len();
        debug!(
            "Flushed {} samples ({} total)",
            samples.len(),
            self.samples_seen
        );
        Ok(())
    }

    fn write_report(&mut self, report: &SafetyReport) -> Result<()> {
        debug!(
            "Safety report: score {:.1}, {} near misses",
            report.overall_safety_score, report.near_miss_count
        );
        Ok(())
    }
}

/// Bounded retry with exponential backoff for sink calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
        }
    }

    /// Call `op` until it succeeds or the attempts run out, returning the last error
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.max_attempts.max(1);
        let mut backoff = Duration::from_millis(self.initial_backoff_ms);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    warn!(
                        "{} failed (attempt {}/{}): {:#}",
                        what, attempt, attempts, err
                    );
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                        backoff *= 2;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Append-only batch buffer in front of a sink
#[derive(Debug)]
pub struct TelemetryBuffer {
    pending: Vec<TelemetrySample>,
    batch_size: usize,
    retry: RetryPolicy,
    /// Samples given up on after retries ran out
    pub dropped: usize,
    pub flushed: usize,
}

impl TelemetryBuffer {
    pub fn new(batch_size: usize, retry: RetryPolicy) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            pending: Vec::with_capacity(batch_size),
            batch_size,
            retry,
            dropped: 0,
            flushed: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue samples, flushing whenever a full batch is ready
    pub fn extend(&mut self, samples: &[TelemetrySample], sink: &mut dyn TelemetrySink) {
        for sample in samples {
            self.pending.push(*sample);
            if self.pending.len() >= self.batch_size {
                self.flush(sink);
            }
        }
    }

    /// Hand everything pending to the sink. Never fails: a batch that cannot
    /// be written is logged and dropped.
    pub fn flush(&mut self, sink: &mut dyn TelemetrySink) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        match self
            .retry
            .run("Telemetry flush", || sink.write_samples(&batch))
        {
            Ok(()) => self.flushed += batch.len(),
            Err(err) => {
                warn!("Dropping {} telemetry samples: {:#}", batch.len(), err);
                self.dropped += batch.len();
            }
        }
    }
}
