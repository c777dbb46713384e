//! Autonomous driver tests
//!
//! Validates waypoint following, the stop/brake policy and collision handling

use road_safety_sim::simulation::driver::{waypoints_for, DRIVER_MAX_BRAKING};
use road_safety_sim::simulation::{
    Environment, LightId, LightState, Obstacle, Point, Scenario, SimDriver, TrafficLight,
    TrafficLightSpec, VehicleId, VehicleState, Weather,
};

const DT: f64 = 0.1;

fn road_to(end: Point) -> Scenario {
    Scenario::straight_road(end, Point::new(end.x + 500.0, end.y))
}

fn moving_driver(scenario: &Scenario, speed: f64) -> SimDriver {
    SimDriver::new(VehicleId(0), scenario).with_state(VehicleState {
        id: VehicleId(0),
        position: Point::new(0.0, 0.0),
        heading: 0.0,
        speed,
        waypoint_index: 0,
    })
}

fn light_at(x: f64, y: f64, state: LightState) -> TrafficLight {
    let spec = TrafficLightSpec {
        x,
        y,
        green_duration: 30.0,
        yellow_duration: 5.0,
        red_duration: 30.0,
    };
    TrafficLight::new(LightId(0), &spec, state)
}

#[test]
fn test_waypoint_advances_inside_threshold() {
    let scenario = road_to(Point::new(9.9, 0.0));
    let mut driver = SimDriver::new(VehicleId(0), &scenario);
    let state = driver.advance(DT, &Environment::empty());
    assert_eq!(state.waypoint_index, 1);
}

#[test]
fn test_waypoint_holds_outside_threshold() {
    let scenario = road_to(Point::new(10.1, 0.0));
    let mut driver = SimDriver::new(VehicleId(0), &scenario);
    let state = driver.advance(DT, &Environment::empty());
    assert_eq!(state.waypoint_index, 0);
}

#[test]
fn test_waypoint_index_wraps_around_loop() {
    let scenario = road_to(Point::new(5.0, 0.0));
    let mut driver = SimDriver::new(VehicleId(0), &scenario).with_state(VehicleState {
        id: VehicleId(0),
        position: Point::new(505.0, 0.0),
        heading: 0.0,
        speed: 0.0,
        waypoint_index: 1,
    });
    let state = driver.advance(DT, &Environment::empty());
    assert_eq!(state.waypoint_index, 0, "last waypoint should wrap to the first");
}

#[test]
fn test_placed_state_is_normalized() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let driver = SimDriver::new(VehicleId(0), &scenario).with_state(VehicleState {
        id: VehicleId(0),
        position: Point::new(0.0, 0.0),
        heading: 3.0 * std::f64::consts::PI + 0.5,
        speed: 80.0,
        waypoint_index: 7,
    });

    let state = driver.state();
    assert!((state.heading - (-std::f64::consts::PI + 0.5)).abs() < 1e-9);
    assert_eq!(state.speed, 50.0, "speed is clamped to the vehicle cap");
    assert_eq!(state.waypoint_index, 1);

    let reversing = SimDriver::new(VehicleId(0), &scenario).with_state(VehicleState {
        speed: -75.0,
        ..*driver.state()
    });
    assert_eq!(reversing.state().speed, -50.0);
}

#[test]
fn test_fallback_waypoints_form_circle() {
    let waypoints = waypoints_for(&Scenario::default());
    assert_eq!(waypoints.len(), 20);
    for wp in &waypoints {
        let radius = wp.distance(&Point::new(300.0, 300.0));
        assert!((radius - 200.0).abs() < 1e-9);
    }
    assert!((waypoints[0].x - 500.0).abs() < 1e-9);
    assert!((waypoints[0].y - 300.0).abs() < 1e-9);
}

#[test]
fn test_fallback_used_when_first_road_is_empty() {
    let mut scenario = road_to(Point::new(50.0, 0.0));
    scenario.roads[0].points.clear();
    assert_eq!(waypoints_for(&scenario).len(), 20);
}

#[test]
fn test_sitting_on_waypoint_produces_no_nan() {
    let scenario = road_to(Point::new(0.0, 0.0));
    let mut driver = SimDriver::new(VehicleId(0), &scenario);
    let state = driver.advance(DT, &Environment::empty());
    assert!(state.heading.is_finite());
    assert!(state.position.is_finite());
    assert_eq!(state.waypoint_index, 1);
}

#[test]
fn test_accelerates_to_target_speed_and_no_further() {
    let scenario = road_to(Point::new(2000.0, 0.0));
    let mut driver = SimDriver::new(VehicleId(0), &scenario);
    let env = Environment::empty();

    let first = driver.advance(DT, &env);
    assert!((first.speed - 0.3).abs() < 1e-12, "3 m/s^2 for one tick");

    for _ in 0..100 {
        let state = driver.advance(DT, &env);
        assert!(state.speed <= 15.0);
    }
    assert_eq!(driver.state().speed, 15.0);
}

#[test]
fn test_snow_reduces_driver_acceleration() {
    let mut scenario = road_to(Point::new(2000.0, 0.0));
    scenario.weather = Weather::Snow;
    let mut driver = SimDriver::new(VehicleId(0), &scenario);
    let state = driver.advance(DT, &Environment::empty());
    assert!((state.speed - 0.25).abs() < 1e-12);
}

#[test]
fn test_turn_rate_is_limited() {
    // Waypoint straight up, vehicle facing along +x
    let scenario = Scenario::straight_road(Point::new(0.0, 200.0), Point::new(0.0, 400.0));
    let mut driver = moving_driver(&scenario, 10.0);
    let state = driver.advance(DT, &Environment::empty());
    assert!((state.heading - 0.05).abs() < 1e-9, "heading {}", state.heading);
    assert!(driver.controls().steering > 0.0);
}

#[test]
fn test_red_light_ahead_brakes() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let mut driver = moving_driver(&scenario, 10.0);
    let mut env = Environment::empty();
    env.lights.push(light_at(20.0, 0.0, LightState::Red));

    let state = driver.advance(DT, &env);
    assert!((state.speed - (10.0 - DRIVER_MAX_BRAKING * DT)).abs() < 1e-12);
    assert!((driver.controls().brake_intensity - 10.0).abs() < 1e-9);
}

#[test]
fn test_yellow_light_also_stops() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let mut driver = moving_driver(&scenario, 0.2);
    let mut env = Environment::empty();
    env.lights.push(light_at(-10.0, 5.0, LightState::Yellow));

    let state = driver.advance(DT, &env);
    assert_eq!(state.speed, 0.0, "braking floors at zero");
}

#[test]
fn test_green_or_distant_lights_are_ignored() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let mut driver = moving_driver(&scenario, 10.0);
    let mut env = Environment::empty();
    env.lights.push(light_at(20.0, 0.0, LightState::Green));
    env.lights.push(light_at(40.0, 0.0, LightState::Red));

    let state = driver.advance(DT, &env);
    assert!(state.speed > 10.0);
}

#[test]
fn test_pedestrian_in_forward_cone_brakes() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let mut driver = moving_driver(&scenario, 10.0);
    let mut env = Environment::empty();
    env.pedestrians.push(Point::new(15.0, 5.0));

    let state = driver.advance(DT, &env);
    assert!(state.speed < 10.0);
}

#[test]
fn test_pedestrian_behind_or_beside_is_ignored() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let mut driver = moving_driver(&scenario, 10.0);
    let mut env = Environment::empty();
    env.pedestrians.push(Point::new(-10.0, 0.0));
    env.pedestrians.push(Point::new(1.0, 15.0));
    env.pedestrians.push(Point::new(25.0, 0.0));

    let state = driver.advance(DT, &env);
    assert!(state.speed > 10.0);
}

#[test]
fn test_collision_applied_once_per_contact() {
    let scenario = road_to(Point::new(500.0, 0.0));
    let mut driver = moving_driver(&scenario, 10.0);
    let mut env = Environment::empty();
    env.obstacles.push(Obstacle {
        center: Point::new(3.0, 0.0),
        radius: 1.0,
    });

    let first = driver.advance(DT, &env);
    assert!(driver.controls().collided);
    assert!((first.speed - 10.3 * 0.3).abs() < 1e-9);
    assert_eq!(driver.collisions, 1);

    driver.advance(DT, &env);
    assert!(!driver.controls().collided, "still touching, not a new hit");
    assert_eq!(driver.collisions, 1);
}

#[test]
fn test_heading_stays_normalized_on_circuit() {
    let mut driver = SimDriver::new(VehicleId(3), &Scenario::default());
    let env = Environment::empty();
    for _ in 0..3000 {
        let state = driver.advance(DT, &env);
        assert!(state.heading > -std::f64::consts::PI && state.heading <= std::f64::consts::PI);
        assert!(state.waypoint_index < 20);
        assert_eq!(state.id, VehicleId(3));
    }
    assert!(driver.distance_travelled > 0.0);
}
