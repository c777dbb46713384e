//! Kinematic vehicle model
//!
//! Pure functions over explicit state. Nothing in here holds mutable fields,
//! so the same model serves every vehicle in a run.

use super::scenario::Weather;
use super::types::{Point, MAX_SPEED, VEHICLE_RADIUS};

/// Peak throttle acceleration on a dry road (m/s^2)
pub const BASE_ACCELERATION: f64 = 5.0;

/// Peak braking deceleration on a dry road (m/s^2)
pub const BASE_BRAKING: f64 = 8.0;

pub const DRAG_COEFFICIENT: f64 = 0.02;

/// Rolling resistance on a dry road (m/s^2)
pub const ROLLING_RESISTANCE: f64 = 0.5;

/// Speeds below this snap to zero
pub const STICTION_DEADBAND: f64 = 0.1;

/// Turn rate at standstill (rad/s)
pub const BASE_TURN_RATE: f64 = 1.5;

/// Fraction of speed kept after an impact
pub const COLLISION_RESTITUTION: f64 = 0.3;

/// A round obstacle a vehicle can hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Point,
    pub radius: f64,
}

/// Road friction for the given weather
pub fn friction_for(weather: Weather) -> f64 {
    match weather {
        Weather::Clear => 1.0,
        Weather::Rain => 0.7,
        Weather::Fog => 0.8,
        Weather::Snow => 0.5,
        Weather::Unknown => 1.0,
    }
}

/// Normalize an angle into (-PI, PI]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.sin().atan2(angle.cos());
    // atan2 may hand back -PI for the boundary; keep the half-open range
    if wrapped <= -std::f64::consts::PI {
        std::f64::consts::PI
    } else {
        wrapped
    }
}

/// Signed difference `to - from`, normalized into (-PI, PI]
pub fn angle_difference(to: f64, from: f64) -> f64 {
    normalize_angle(to - from)
}

/// Advance longitudinal velocity by one step.
///
/// Braking takes priority over throttle. Returns the new velocity, clamped to
/// +-`MAX_SPEED` and snapped to zero inside the stiction deadband, together
/// with the total (pre-clamp) acceleration that was applied.
pub fn integrate_velocity(
    current_velocity: f64,
    throttle: f64,
    brake: f64,
    friction: f64,
    dt: f64,
) -> (f64, f64) {
    let control = if brake > 0.0 {
        -brake * BASE_BRAKING * friction
    } else {
        throttle * BASE_ACCELERATION * friction
    };

    let drag = -DRAG_COEFFICIENT * current_velocity * current_velocity.abs();

    let rolling = if current_velocity > 0.0 {
        -ROLLING_RESISTANCE * friction
    } else if current_velocity < 0.0 {
        ROLLING_RESISTANCE * friction
    } else {
        0.0
    };

    let total_acceleration = control + drag + rolling;

    let mut velocity = (current_velocity + total_acceleration * dt).clamp(-MAX_SPEED, MAX_SPEED);
    if velocity.abs() < STICTION_DEADBAND {
        velocity = 0.0;
    }

    (velocity, total_acceleration)
}

/// Maximum turn rate at the given speed; slower vehicles turn tighter
pub fn max_turn_rate(speed: f64) -> f64 {
    BASE_TURN_RATE / (1.0 + 0.05 * speed.abs())
}

/// Advance heading by one step for a steering input in [-1, 1]
pub fn integrate_heading(current_heading: f64, steering: f64, speed: f64, dt: f64) -> f64 {
    let turn_rate = steering * max_turn_rate(speed);
    normalize_angle(current_heading + turn_rate * dt)
}

/// Advance position along the heading by one step
pub fn integrate_position(x: f64, y: f64, velocity: f64, heading: f64, dt: f64) -> (f64, f64) {
    (
        x + velocity * heading.cos() * dt,
        y + velocity * heading.sin() * dt,
    )
}

/// Whether a vehicle centred at (x, y) overlaps any obstacle
pub fn check_collision(x: f64, y: f64, obstacles: &[Obstacle]) -> bool {
    let vehicle = Point::new(x, y);
    obstacles
        .iter()
        .any(|o| vehicle.distance(&o.center) < VEHICLE_RADIUS + o.radius)
}

/// Velocity after an impact
pub fn collision_response(velocity: f64) -> f64 {
    velocity * COLLISION_RESTITUTION
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn normalize_keeps_half_open_range() {
        assert!((normalize_angle(PI) - PI).abs() < 1e-12);
        let wrapped = normalize_angle(-PI);
        assert!(wrapped > 0.0 && (wrapped - PI).abs() < 1e-12);
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-9);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rolling_resistance_is_zero_at_rest() {
        let (v, a) = integrate_velocity(0.0, 0.0, 0.0, 1.0, 0.1);
        assert_eq!(v, 0.0);
        assert_eq!(a, 0.0);
    }
}
