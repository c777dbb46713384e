//! Scenario description consumed at the start of a run
//!
//! The field names follow the JSON documents produced by the scenario
//! builder, so a stored scenario can be deserialized directly.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Point, DEFAULT_OBSTACLE_RADIUS, TICK_SECS};

/// Malformed scenario data
#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("road {road} point {point} has a non-finite coordinate")]
    BadRoadPoint { road: usize, point: usize },
    #[error("{kind} {index} has a non-finite position")]
    BadPosition { kind: &'static str, index: usize },
    #[error("traffic light {index} has a {phase} duration shorter than one tick")]
    BadLightDuration { index: usize, phase: &'static str },
    #[error("hazard {index} has a negative radius")]
    BadHazardRadius { index: usize },
    #[error("weather intensity {0} is outside [0, 1]")]
    BadWeatherIntensity(f64),
}

/// Weather affecting road friction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Fog,
    Snow,
    #[serde(other)]
    Unknown,
}

/// A road segment given as a polyline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub points: Vec<Point>,
    #[serde(default = "default_road_width")]
    pub width: f64,
    #[serde(default = "default_lanes")]
    pub lanes: u32,
}

fn default_road_width() -> f64 {
    40.0
}

fn default_lanes() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_green")]
    pub green_duration: f64,
    #[serde(default = "default_yellow")]
    pub yellow_duration: f64,
    #[serde(default = "default_red")]
    pub red_duration: f64,
}

fn default_green() -> f64 {
    30.0
}

fn default_yellow() -> f64 {
    5.0
}

fn default_red() -> f64 {
    30.0
}

impl TrafficLightSpec {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSign {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crosswalk {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default = "default_spawn_rate")]
    pub spawn_rate: f64,
}

fn default_spawn_rate() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Cone,
    Barrier,
    ParkedCar,
    SlipperyPatch,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    #[serde(rename = "type")]
    pub kind: HazardKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub radius: Option<f64>,
}

impl Hazard {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether a vehicle can physically hit this hazard
    pub fn is_solid(&self) -> bool {
        self.kind != HazardKind::SlipperyPatch
    }

    pub fn radius(&self) -> f64 {
        self.radius.unwrap_or(DEFAULT_OBSTACLE_RADIUS)
    }
}

/// Immutable description of the road world for one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roads: Vec<Road>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLightSpec>,
    #[serde(default)]
    pub stop_signs: Vec<StopSign>,
    #[serde(default)]
    pub crosswalks: Vec<Crosswalk>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default = "default_weather_intensity")]
    pub weather_intensity: f64,
}

fn default_weather_intensity() -> f64 {
    0.5
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let scenario: Scenario =
            serde_json::from_str(json).context("Scenario JSON is malformed")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// A single straight road with nothing else on it
    pub fn straight_road(from: Point, to: Point) -> Self {
        Self {
            name: "straight road".to_string(),
            roads: vec![Road {
                points: vec![from, to],
                width: default_road_width(),
                lanes: default_lanes(),
            }],
            weather_intensity: default_weather_intensity(),
            ..Default::default()
        }
    }

    /// A rectangular loop with one light, one crosswalk and a few hazards
    pub fn demo() -> Self {
        let corners = [
            Point::new(200.0, 200.0),
            Point::new(1000.0, 200.0),
            Point::new(1000.0, 600.0),
            Point::new(200.0, 600.0),
        ];
        Self {
            name: "demo loop".to_string(),
            roads: vec![Road {
                points: corners.to_vec(),
                width: default_road_width(),
                lanes: default_lanes(),
            }],
            traffic_lights: vec![TrafficLightSpec {
                x: 600.0,
                y: 200.0,
                green_duration: default_green(),
                yellow_duration: default_yellow(),
                red_duration: default_red(),
            }],
            stop_signs: vec![StopSign { x: 1000.0, y: 400.0 }],
            crosswalks: vec![Crosswalk {
                x1: 600.0,
                y1: 590.0,
                x2: 600.0,
                y2: 610.0,
                spawn_rate: default_spawn_rate(),
            }],
            hazards: vec![
                Hazard {
                    kind: HazardKind::Cone,
                    x: 400.0,
                    y: 600.0,
                    radius: Some(0.5),
                },
                Hazard {
                    kind: HazardKind::SlipperyPatch,
                    x: 1000.0,
                    y: 300.0,
                    radius: Some(5.0),
                },
            ],
            weather: Weather::Clear,
            weather_intensity: default_weather_intensity(),
        }
    }

    /// Check the values serde cannot rule out on its own
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (road, r) in self.roads.iter().enumerate() {
            if let Some(point) = r.points.iter().position(|p| !p.is_finite()) {
                return Err(ScenarioError::BadRoadPoint { road, point });
            }
        }

        for (index, light) in self.traffic_lights.iter().enumerate() {
            if !light.position().is_finite() {
                return Err(ScenarioError::BadPosition { kind: "traffic light", index });
            }
            for (phase, duration) in [
                ("green", light.green_duration),
                ("yellow", light.yellow_duration),
                ("red", light.red_duration),
            ] {
                if !duration.is_finite() || duration < TICK_SECS {
                    return Err(ScenarioError::BadLightDuration { index, phase });
                }
            }
        }

        for (index, sign) in self.stop_signs.iter().enumerate() {
            if !Point::new(sign.x, sign.y).is_finite() {
                return Err(ScenarioError::BadPosition { kind: "stop sign", index });
            }
        }

        for (index, cw) in self.crosswalks.iter().enumerate() {
            if !Point::new(cw.x1, cw.y1).is_finite() || !Point::new(cw.x2, cw.y2).is_finite() {
                return Err(ScenarioError::BadPosition { kind: "crosswalk", index });
            }
        }

        for (index, hazard) in self.hazards.iter().enumerate() {
            if !hazard.position().is_finite() {
                return Err(ScenarioError::BadPosition { kind: "hazard", index });
            }
            if hazard.radius.is_some_and(|r| r < 0.0) {
                return Err(ScenarioError::BadHazardRadius { index });
            }
        }

        if !(0.0..=1.0).contains(&self.weather_intensity) {
            return Err(ScenarioError::BadWeatherIntensity(self.weather_intensity));
        }

        Ok(())
    }

    /// Hazard positions, for exposure scoring
    pub fn hazard_positions(&self) -> Vec<Point> {
        self.hazards.iter().map(Hazard::position).collect()
    }
}
