//! Simulation world: the deterministic stepping function
//!
//! `SimWorld::tick` advances every driver once, samples telemetry on its
//! cadence and then applies environment changes. It never sleeps; pacing
//! against the wall clock lives in the run wrapper.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::driver::SimDriver;
use super::environment::{Environment, LightCycling};
use super::scenario::{Scenario, Weather};
use super::stats::RunSummary;
use super::telemetry::{TelemetryMode, TelemetrySample};
use super::types::{VehicleId, VehicleState, TELEMETRY_EVERY_TICKS, TICK_SECS};

/// The main simulation world
pub struct SimWorld {
    /// Drivers, indexed by vehicle id
    pub drivers: Vec<SimDriver>,

    pub environment: Environment,

    /// Every sample taken so far, in chronological order
    pub trace: Vec<TelemetrySample>,

    /// Ticks completed
    pub ticks: u64,

    /// Simulation time
    pub time: f64,

    telemetry_mode: TelemetryMode,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl SimWorld {
    fn new_internal(
        scenario: &Scenario,
        vehicle_count: usize,
        cycling: LightCycling,
        telemetry_mode: TelemetryMode,
        mut rng: Option<StdRng>,
    ) -> Self {
        if scenario.weather == Weather::Unknown {
            warn!(
                "Scenario '{}' has unrecognized weather; using clear-road friction",
                scenario.name
            );
        }

        let drivers = (0..vehicle_count)
            .map(|i| SimDriver::new(VehicleId(i), scenario))
            .collect();

        let environment = match &mut rng {
            Some(rng) => Environment::new(scenario, cycling, rng),
            None => Environment::new(scenario, cycling, &mut rand::rng()),
        };

        Self {
            drivers,
            environment,
            trace: Vec::new(),
            ticks: 0,
            time: 0.0,
            telemetry_mode,
            rng,
        }
    }

    pub fn new(
        scenario: &Scenario,
        vehicle_count: usize,
        cycling: LightCycling,
        telemetry_mode: TelemetryMode,
    ) -> Self {
        Self::new_internal(scenario, vehicle_count, cycling, telemetry_mode, None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(
        scenario: &Scenario,
        vehicle_count: usize,
        cycling: LightCycling,
        telemetry_mode: TelemetryMode,
        seed: u64,
    ) -> Self {
        Self::new_internal(
            scenario,
            vehicle_count,
            cycling,
            telemetry_mode,
            Some(StdRng::seed_from_u64(seed)),
        )
    }

    /// Number of ticks needed to cover `duration_secs`
    pub fn ticks_for(duration_secs: f64) -> u64 {
        (duration_secs / TICK_SECS).round() as u64
    }

    pub fn vehicle_states(&self) -> Vec<VehicleState> {
        self.drivers.iter().map(|d| *d.state()).collect()
    }

    /// Main simulation tick. Returns the samples taken on this tick.
    pub fn tick(&mut self) -> &[TelemetrySample] {
        let dt = TICK_SECS;

        // Drivers only see the environment as it stood at the start of the tick
        for driver in &mut self.drivers {
            driver.advance(dt, &self.environment);
        }

        let first_new = self.trace.len();
        if self.ticks % TELEMETRY_EVERY_TICKS == 0 {
            self.sample_all();
        }

        self.environment.advance(dt);

        self.ticks += 1;
        self.time = self.ticks as f64 * dt;

        &self.trace[first_new..]
    }

    fn sample_all(&mut self) {
        let timestamp_ms = (self.ticks as f64 * TICK_SECS * 1000.0).round() as u64;
        let mode = self.telemetry_mode;
        for driver in &self.drivers {
            let sample = match &mut self.rng {
                Some(rng) => TelemetrySample::record(driver, timestamp_ms, mode, rng),
                None => TelemetrySample::record(driver, timestamp_ms, mode, &mut rand::rng()),
            };
            self.trace.push(sample);
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::collect(&self.drivers, &self.trace, self.time)
    }

    /// Log a summary of the world state
    pub fn log_summary(&self) {
        info!("=== Simulation Summary ===");
        info!("Time: {:.1}s ({} ticks)", self.time, self.ticks);
        info!(
            "Vehicles: {}, Lights: {}, Pedestrians: {}, Obstacles: {}",
            self.drivers.len(),
            self.environment.lights.len(),
            self.environment.pedestrians.len(),
            self.environment.obstacles.len()
        );
        for driver in &self.drivers {
            let state = driver.state();
            info!(
                "  Vehicle {:?}: speed={:.1}, position=({:.1}, {:.1}), waypoint={}",
                state.id.0, state.speed, state.position.x, state.position.y, state.waypoint_index
            );
        }
    }
}
