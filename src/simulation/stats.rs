//! Summary statistics for a run

use serde::{Deserialize, Serialize};

use super::driver::SimDriver;
use super::telemetry::TelemetrySample;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub vehicles: usize,
    pub simulated_secs: f64,
    pub samples: usize,
    /// Mean sampled speed (m/s)
    pub average_speed: f64,
    /// Highest sampled speed (m/s)
    pub max_speed: f64,
    /// Summed over all vehicles (m)
    pub distance_travelled: f64,
    pub collisions: usize,
}

impl RunSummary {
    pub fn collect(drivers: &[SimDriver], trace: &[TelemetrySample], simulated_secs: f64) -> Self {
        let average_speed = if trace.is_empty() {
            0.0
        } else {
            trace.iter().map(|s| s.speed).sum::<f64>() / trace.len() as f64
        };
        let max_speed = trace.iter().map(|s| s.speed).fold(0.0, f64::max);

        Self {
            vehicles: drivers.len(),
            simulated_secs,
            samples: trace.len(),
            average_speed,
            max_speed,
            distance_travelled: drivers.iter().map(|d| d.distance_travelled).sum(),
            collisions: drivers.iter().map(|d| d.collisions).sum(),
        }
    }
}
