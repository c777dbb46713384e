//! Autonomous driver behavior
//!
//! Each driver owns one vehicle, follows a closed loop of waypoints and
//! reacts to traffic lights and pedestrians in the shared environment.

use log::debug;
use std::f64::consts::TAU;

use super::environment::Environment;
use super::kinematics::{
    angle_difference, check_collision, collision_response, friction_for, integrate_heading,
    integrate_position, max_turn_rate, normalize_angle, BASE_ACCELERATION, BASE_BRAKING,
};
use super::scenario::Scenario;
use super::types::{
    Point, VehicleId, VehicleState, LIGHT_LOOKAHEAD, MAX_SPEED, PEDESTRIAN_CONE_HALF_ANGLE,
    PEDESTRIAN_LOOKAHEAD, TARGET_SPEED, WAYPOINT_REACHED_DISTANCE,
};

/// Most a driver will accelerate (m/s^2)
pub const DRIVER_MAX_ACCELERATION: f64 = 3.0;

/// Most a driver will brake (m/s^2)
pub const DRIVER_MAX_BRAKING: f64 = 5.0;

/// Most a driver will turn toward its waypoint (rad/s)
pub const DRIVER_MAX_TURN_RATE: f64 = 0.5;

const FALLBACK_WAYPOINTS: usize = 20;
const FALLBACK_CENTER: Point = Point { x: 300.0, y: 300.0 };
const FALLBACK_RADIUS: f64 = 200.0;

/// What the driver did on its last tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverControls {
    /// Measured speed change over the tick (m/s^2)
    pub acceleration: f64,
    /// Applied braking on a 0..10 scale
    pub brake_intensity: f64,
    /// Steering input in [-1, 1]
    pub steering: f64,
    /// Whether the vehicle hit an obstacle this tick
    pub collided: bool,
}

/// An autonomous driver controlling one vehicle
#[derive(Debug, Clone)]
pub struct SimDriver {
    state: VehicleState,
    waypoints: Vec<Point>,
    max_acceleration: f64,
    max_braking: f64,
    in_contact: bool,
    controls: DriverControls,
    /// Obstacles hit so far
    pub collisions: usize,
    /// Distance covered so far (m)
    pub distance_travelled: f64,
}

impl SimDriver {
    pub fn new(id: VehicleId, scenario: &Scenario) -> Self {
        let friction = friction_for(scenario.weather);
        Self {
            state: VehicleState::new(id),
            waypoints: waypoints_for(scenario),
            max_acceleration: DRIVER_MAX_ACCELERATION.min(BASE_ACCELERATION * friction),
            max_braking: DRIVER_MAX_BRAKING.min(BASE_BRAKING * friction),
            in_contact: false,
            controls: DriverControls::default(),
            collisions: 0,
            distance_travelled: 0.0,
        }
    }

    /// Place the vehicle somewhere else before the run starts
    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.state = state;
        self.state.heading = normalize_angle(state.heading);
        self.state.speed = state.speed.clamp(-MAX_SPEED, MAX_SPEED);
        self.state.waypoint_index %= self.waypoints.len();
        self
    }

    pub fn id(&self) -> VehicleId {
        self.state.id
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn controls(&self) -> &DriverControls {
        &self.controls
    }

    /// Run one tick of the driver and return the new vehicle state
    pub fn advance(&mut self, dt: f64, environment: &Environment) -> VehicleState {
        let target = self.waypoints[self.state.waypoint_index];
        let distance = self.state.position.distance(&target);

        if distance < WAYPOINT_REACHED_DISTANCE {
            self.state.waypoint_index = (self.state.waypoint_index + 1) % self.waypoints.len();
        }

        // Sitting exactly on the waypoint leaves no bearing to steer toward
        let heading_error = self
            .state
            .position
            .bearing_to(&target)
            .map(|bearing| angle_difference(bearing, self.state.heading))
            .unwrap_or(0.0);

        let turn = heading_error.clamp(-DRIVER_MAX_TURN_RATE * dt, DRIVER_MAX_TURN_RATE * dt);
        let steering = (turn / (max_turn_rate(self.state.speed) * dt)).clamp(-1.0, 1.0);
        self.state.heading = integrate_heading(self.state.heading, steering, self.state.speed, dt);

        let should_stop = self.light_requires_stop(environment);
        let pedestrian_ahead = self.pedestrian_ahead(environment);

        let previous_speed = self.state.speed;
        if should_stop || pedestrian_ahead {
            self.state.speed = (self.state.speed - self.max_braking * dt).max(0.0);
        } else if self.state.speed < TARGET_SPEED {
            self.state.speed = (self.state.speed + self.max_acceleration * dt).min(TARGET_SPEED);
        }

        let acceleration = (self.state.speed - previous_speed) / dt;
        let brake_intensity = if acceleration < 0.0 {
            (-acceleration / DRIVER_MAX_BRAKING * 10.0).min(10.0)
        } else {
            0.0
        };

        let (x, y) = integrate_position(
            self.state.position.x,
            self.state.position.y,
            self.state.speed,
            self.state.heading,
            dt,
        );
        let moved = Point::new(x, y);
        self.distance_travelled += self.state.position.distance(&moved);
        self.state.position = moved;

        let touching = check_collision(x, y, &environment.obstacles);
        let collided = touching && !self.in_contact;
        if collided {
            self.state.speed = collision_response(self.state.speed);
            self.collisions += 1;
            debug!(
                "Vehicle {:?} hit an obstacle at ({:.1}, {:.1})",
                self.state.id.0, x, y
            );
        }
        self.in_contact = touching;

        self.controls = DriverControls {
            acceleration,
            brake_intensity,
            steering,
            collided,
        };

        self.state
    }

    fn light_requires_stop(&self, environment: &Environment) -> bool {
        environment.lights.iter().any(|light| {
            self.state.position.distance(&light.position) < LIGHT_LOOKAHEAD
                && light.state.requires_stop()
        })
    }

    fn pedestrian_ahead(&self, environment: &Environment) -> bool {
        environment.pedestrians.iter().any(|ped| {
            if self.state.position.distance(ped) >= PEDESTRIAN_LOOKAHEAD {
                return false;
            }
            match self.state.position.bearing_to(ped) {
                Some(bearing) => {
                    angle_difference(bearing, self.state.heading).abs() < PEDESTRIAN_CONE_HALF_ANGLE
                }
                // Standing right on top of the vehicle
                None => true,
            }
        })
    }
}

/// Waypoints from the first road, or a circle when the scenario has none
pub fn waypoints_for(scenario: &Scenario) -> Vec<Point> {
    let from_road: Vec<Point> = scenario
        .roads
        .first()
        .map(|road| road.points.clone())
        .unwrap_or_default();

    if !from_road.is_empty() {
        return from_road;
    }

    (0..FALLBACK_WAYPOINTS)
        .map(|i| {
            let angle = i as f64 / FALLBACK_WAYPOINTS as f64 * TAU;
            Point::new(
                FALLBACK_CENTER.x + FALLBACK_RADIUS * angle.cos(),
                FALLBACK_CENTER.y + FALLBACK_RADIUS * angle.sin(),
            )
        })
        .collect()
}
