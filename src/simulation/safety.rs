//! Post-run safety analysis
//!
//! Turns a complete telemetry trace into a collision-density heatmap and a
//! handful of scalar risk scores. Everything here runs once per run, after
//! the last tick.

use serde::{Deserialize, Serialize};

use super::telemetry::TelemetrySample;
use super::types::Point;

/// Brake intensity above which a sample counts as a hard-braking event
pub const HARD_BRAKE_THRESHOLD: f64 = 5.0;

/// Brake intensity above which a sample can be part of a near miss
pub const NEAR_MISS_BRAKE_THRESHOLD: f64 = 7.0;

/// Speed the previous sample must exceed for a near miss (m/s)
pub const NEAR_MISS_SPEED_THRESHOLD: f64 = 10.0;

/// Distance from a hazard that counts as exposure (m)
pub const HAZARD_DANGER_RADIUS: f64 = 10.0;

/// Heatmap grid and canvas dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    pub grid_size: usize,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            grid_size: 50,
            canvas_width: 1200.0,
            canvas_height: 800.0,
        }
    }
}

/// Grid of hard-braking counts, indexed `cells[row][col]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionHeatmap {
    pub grid_size: usize,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub cells: Vec<Vec<u32>>,
}

impl CollisionHeatmap {
    pub fn empty(config: HeatmapConfig) -> Self {
        Self {
            grid_size: config.grid_size,
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
            cells: vec![vec![0; config.grid_size]; config.grid_size],
        }
    }

    /// Cell containing a position, or `None` when it lies off the canvas
    pub fn cell_for(&self, position: &Point) -> Option<(usize, usize)> {
        if self.grid_size == 0 || !position.is_finite() {
            return None;
        }
        let cell_width = self.canvas_width / self.grid_size as f64;
        let cell_height = self.canvas_height / self.grid_size as f64;
        let col = (position.x / cell_width).floor();
        let row = (position.y / cell_height).floor();
        let limit = self.grid_size as f64;
        if col < 0.0 || row < 0.0 || col >= limit || row >= limit {
            return None;
        }
        Some((row as usize, col as usize))
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().map(|&c| c as u64).sum()
    }
}

/// One heatmap cell with its count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub row: usize,
    pub col: usize,
    pub count: u32,
}

/// Count hard-braking samples per grid cell; off-canvas samples are dropped
pub fn collision_heatmap(trace: &[TelemetrySample], config: HeatmapConfig) -> CollisionHeatmap {
    let mut heatmap = CollisionHeatmap::empty(config);
    for sample in trace
        .iter()
        .filter(|s| s.brake_intensity > HARD_BRAKE_THRESHOLD)
    {
        if let Some((row, col)) = heatmap.cell_for(&sample.position) {
            heatmap.cells[row][col] += 1;
        }
    }
    heatmap
}

/// Count adjacent sample pairs where hard braking follows high speed.
/// The trace must be in chronological order.
pub fn near_miss_count(trace: &[TelemetrySample]) -> usize {
    trace
        .windows(2)
        .filter(|pair| {
            pair[1].brake_intensity > NEAR_MISS_BRAKE_THRESHOLD
                && pair[0].speed > NEAR_MISS_SPEED_THRESHOLD
        })
        .count()
}

/// Share of samples within the danger radius of any hazard, scaled to 0..100
pub fn hazard_exposure(trace: &[TelemetrySample], hazards: &[Point]) -> f64 {
    if trace.is_empty() || hazards.is_empty() {
        return 0.0;
    }
    let exposed = trace
        .iter()
        .filter(|s| {
            hazards
                .iter()
                .any(|h| s.position.distance(h) < HAZARD_DANGER_RADIUS)
        })
        .count();
    (exposed as f64 / trace.len() as f64 * 200.0).min(100.0)
}

/// Overall score, 0..100 where higher is safer
pub fn overall_safety_score(
    trace: &[TelemetrySample],
    near_misses: usize,
    hazard_exposure: f64,
) -> f64 {
    if trace.is_empty() {
        return 100.0;
    }

    let mean_brake =
        trace.iter().map(|s| s.brake_intensity).sum::<f64>() / trace.len() as f64;

    let steering_jitter = if trace.len() > 1 {
        trace
            .windows(2)
            .map(|pair| (pair[1].steering_angle - pair[0].steering_angle).abs())
            .sum::<f64>()
            / (trace.len() - 1) as f64
    } else {
        0.0
    };

    let score = 100.0
        - 5.0 * near_misses as f64
        - 0.2 * hazard_exposure
        - 2.0 * mean_brake
        - steering_jitter;

    score.clamp(0.0, 100.0)
}

/// Aggregate risk output of one completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub collision_heatmap: CollisionHeatmap,
    pub near_miss_count: usize,
    pub hazard_exposure_score: f64,
    pub overall_safety_score: f64,
}

impl SafetyReport {
    /// Run every analysis over a finished trace
    pub fn analyze(trace: &[TelemetrySample], hazards: &[Point], config: HeatmapConfig) -> Self {
        let near_misses = near_miss_count(trace);
        let exposure = hazard_exposure(trace, hazards);
        Self {
            collision_heatmap: collision_heatmap(trace, config),
            near_miss_count: near_misses,
            hazard_exposure_score: exposure,
            overall_safety_score: overall_safety_score(trace, near_misses, exposure),
        }
    }

    /// The `n` densest non-empty cells, densest first
    pub fn hotspots(&self, n: usize) -> Vec<Hotspot> {
        let mut spots: Vec<Hotspot> = self
            .collision_heatmap
            .cells
            .iter()
            .enumerate()
            .flat_map(|(row, cols)| {
                cols.iter()
                    .enumerate()
                    .filter(|(_, &count)| count > 0)
                    .map(move |(col, &count)| Hotspot { row, col, count })
            })
            .collect();
        spots.sort_by(|a, b| b.count.cmp(&a.count).then((a.row, a.col).cmp(&(b.row, b.col))));
        spots.truncate(n);
        spots
    }
}
