//! Shared environment state: traffic lights, pedestrians and obstacles
//!
//! The world is the only writer. Drivers get a shared borrow for the whole
//! tick, so light changes can only be applied once every driver is done.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::kinematics::Obstacle;
use super::scenario::{Scenario, TrafficLightSpec};
use super::types::{Point, GLOBAL_LIGHT_TOGGLE_SECS};

/// Probability that a crosswalk starts the run with a pedestrian on it
pub const PEDESTRIAN_SPAWN_PROBABILITY: f64 = 0.5;

/// A wrapper type for traffic light IDs (index into the scenario's lights)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Green,
    Yellow,
    Red,
}

impl LightState {
    /// Whether a driver approaching this light should stop
    pub fn requires_stop(self) -> bool {
        matches!(self, LightState::Yellow | LightState::Red)
    }
}

/// How traffic lights change over a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightCycling {
    /// Each light runs green -> yellow -> red on its own configured durations
    #[default]
    Timed,
    /// Every 20 simulated seconds all lights flip between green and red
    GlobalToggle,
}

/// Runtime state of one traffic light
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub id: LightId,
    pub position: Point,
    pub state: LightState,
    /// Time spent in the current phase
    pub phase_elapsed: f64,
    green_duration: f64,
    yellow_duration: f64,
    red_duration: f64,
}

impl TrafficLight {
    pub fn new(id: LightId, spec: &TrafficLightSpec, state: LightState) -> Self {
        Self {
            id,
            position: spec.position(),
            state,
            phase_elapsed: 0.0,
            green_duration: spec.green_duration,
            yellow_duration: spec.yellow_duration,
            red_duration: spec.red_duration,
        }
    }

    fn phase_duration(&self) -> f64 {
        match self.state {
            LightState::Green => self.green_duration,
            LightState::Yellow => self.yellow_duration,
            LightState::Red => self.red_duration,
        }
    }

    fn cycle_duration(&self) -> f64 {
        self.green_duration + self.yellow_duration + self.red_duration
    }

    /// Advance the phase timer. Returns true if the state changed.
    pub fn advance(&mut self, dt: f64) -> bool {
        let before = self.state;
        self.phase_elapsed += dt;

        // Whole cycles end in the same phase, so drop them up front
        let cycle = self.cycle_duration();
        if cycle > 0.0 && self.phase_elapsed >= cycle {
            self.phase_elapsed %= cycle;
        }

        // At most one full lap of phases per call
        for _ in 0..3 {
            let duration = self.phase_duration();
            if self.phase_elapsed < duration {
                break;
            }
            self.phase_elapsed -= duration;
            self.state = match self.state {
                LightState::Green => LightState::Yellow,
                LightState::Yellow => LightState::Red,
                LightState::Red => LightState::Green,
            };
        }
        self.state != before
    }

    /// Flip between green and red, skipping yellow
    pub fn toggle(&mut self) {
        self.state = match self.state {
            LightState::Red => LightState::Green,
            LightState::Green | LightState::Yellow => LightState::Red,
        };
        self.phase_elapsed = 0.0;
    }
}

/// Environment shared by all drivers in a run
#[derive(Debug, Clone)]
pub struct Environment {
    pub lights: Vec<TrafficLight>,
    pub pedestrians: Vec<Point>,
    pub obstacles: Vec<Obstacle>,
    cycling: LightCycling,
    elapsed_ticks: u64,
}

impl Environment {
    /// Build the starting environment for a scenario.
    ///
    /// Each light starts green or red with equal odds; each crosswalk gets a
    /// pedestrian at its first endpoint with probability 0.5.
    pub fn new<R: Rng>(scenario: &Scenario, cycling: LightCycling, rng: &mut R) -> Self {
        let lights = scenario
            .traffic_lights
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let state = if rng.random_bool(0.5) {
                    LightState::Green
                } else {
                    LightState::Red
                };
                TrafficLight::new(LightId(i), spec, state)
            })
            .collect();

        let pedestrians = scenario
            .crosswalks
            .iter()
            .filter(|_| rng.random_bool(PEDESTRIAN_SPAWN_PROBABILITY))
            .map(|cw| Point::new(cw.x1, cw.y1))
            .collect();

        let obstacles = scenario
            .hazards
            .iter()
            .filter(|h| h.is_solid())
            .map(|h| Obstacle {
                center: h.position(),
                radius: h.radius(),
            })
            .collect();

        Self {
            lights,
            pedestrians,
            obstacles,
            cycling,
            elapsed_ticks: 0,
        }
    }

    /// An environment with nothing in it
    pub fn empty() -> Self {
        Self {
            lights: Vec::new(),
            pedestrians: Vec::new(),
            obstacles: Vec::new(),
            cycling: LightCycling::default(),
            elapsed_ticks: 0,
        }
    }

    pub fn light_state(&self, id: LightId) -> Option<LightState> {
        self.lights.get(id.0).map(|l| l.state)
    }

    /// Apply one tick of environment changes. Call only after every driver
    /// has finished the tick.
    pub fn advance(&mut self, dt: f64) {
        self.elapsed_ticks += 1;

        match self.cycling {
            LightCycling::Timed => {
                for light in &mut self.lights {
                    if light.advance(dt) {
                        debug!("Light {:?} turned {:?}", light.id.0, light.state);
                    }
                }
            }
            LightCycling::GlobalToggle => {
                let period = ((GLOBAL_LIGHT_TOGGLE_SECS / dt).round() as u64).max(1);
                if self.elapsed_ticks % period == 0 {
                    for light in &mut self.lights {
                        light.toggle();
                    }
                    debug!(
                        "Toggled {} lights at tick {}",
                        self.lights.len(),
                        self.elapsed_ticks
                    );
                }
            }
        }
    }
}
