//! Road safety simulation engine
//!
//! Kinematic integration, autonomous drivers, the fixed-timestep world and
//! the post-run safety analyzer. Nothing in here knows about persistence or
//! transport; those sit behind the `TelemetrySink` and `JobTracker` traits.

pub mod driver;
pub mod environment;
pub mod kinematics;
pub mod run;
pub mod safety;
pub mod scenario;
pub mod stats;
pub mod telemetry;
pub mod types;
pub mod world;

pub use driver::{DriverControls, SimDriver};
pub use environment::{Environment, LightCycling, LightId, LightState, TrafficLight};
pub use kinematics::Obstacle;
pub use run::{
    CancelToken, JobEvent, JobTracker, Pacing, RecordingTracker, RunConfig, RunError, RunOutcome,
    RunStatus, SimulationRun,
};
pub use safety::{CollisionHeatmap, HeatmapConfig, Hotspot, SafetyReport};
pub use scenario::{
    Crosswalk, Hazard, HazardKind, Road, Scenario, ScenarioError, StopSign, TrafficLightSpec,
    Weather,
};
pub use stats::RunSummary;
pub use telemetry::{
    LogSink, MemorySink, RetryPolicy, TelemetryBuffer, TelemetryMode, TelemetrySample,
    TelemetrySink,
};
pub use types::{Point, VehicleId, VehicleState, TICK_SECS};
pub use world::SimWorld;
