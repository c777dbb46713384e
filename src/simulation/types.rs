//! Core types for the road safety simulation
//!
//! Plain value types shared by the kinematic model, the drivers and the
//! safety analyzer.

use serde::{Deserialize, Serialize};

/// A unique identifier for a vehicle within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub usize);

/// A 2D position in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Bearing from this point to another, in radians.
    /// Returns `None` when the points coincide (no defined direction).
    pub fn bearing_to(&self, other: &Point) -> Option<f64> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0.0 && dy == 0.0 {
            None
        } else {
            Some(dy.atan2(dx))
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The state of one vehicle, owned by its driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub id: VehicleId,
    pub position: Point,
    /// Radians, normalized to (-PI, PI]
    pub heading: f64,
    /// Signed longitudinal speed in m/s
    pub speed: f64,
    /// Cyclic index into the driver's waypoint sequence
    pub waypoint_index: usize,
}

impl VehicleState {
    pub fn new(id: VehicleId) -> Self {
        Self {
            id,
            position: Point::default(),
            heading: 0.0,
            speed: 0.0,
            waypoint_index: 0,
        }
    }
}

/// Fixed simulation timestep in seconds
pub const TICK_SECS: f64 = 0.1;

/// Telemetry is sampled once per vehicle every this many ticks (0.5 s)
pub const TELEMETRY_EVERY_TICKS: u64 = 5;

/// Hard cap on vehicle speed magnitude (m/s)
pub const MAX_SPEED: f64 = 50.0;

/// Driver cruise speed (m/s)
pub const TARGET_SPEED: f64 = 15.0;

/// Distance under which a waypoint counts as reached
pub const WAYPOINT_REACHED_DISTANCE: f64 = 10.0;

/// Traffic lights closer than this are considered by a driver
pub const LIGHT_LOOKAHEAD: f64 = 30.0;

/// Pedestrians closer than this are considered by a driver
pub const PEDESTRIAN_LOOKAHEAD: f64 = 20.0;

/// Half-angle of the forward cone a pedestrian must be in to stop a driver
pub const PEDESTRIAN_CONE_HALF_ANGLE: f64 = std::f64::consts::FRAC_PI_4;

/// Radius of the vehicle footprint used for collision checks (m)
pub const VEHICLE_RADIUS: f64 = 2.0;

/// Obstacle radius when the scenario does not give one (m)
pub const DEFAULT_OBSTACLE_RADIUS: f64 = 1.0;

/// Legacy global light toggle period (s)
pub const GLOBAL_LIGHT_TOGGLE_SECS: f64 = 20.0;
