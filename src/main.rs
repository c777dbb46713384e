use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use road_safety_sim::simulation::{
    LightCycling, LogSink, Pacing, RecordingTracker, RunConfig, Scenario, SimulationRun,
    TelemetryMode,
};

#[derive(Parser)]
#[command(name = "road_safety_sim")]
#[command(about = "Autonomous driving scenario simulation with safety scoring")]
struct Cli {
    /// Scenario JSON file; a built-in demo loop is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of vehicles to simulate
    #[arg(long, default_value = "5")]
    vehicles: usize,

    /// Simulated duration in seconds (10-600)
    #[arg(long, default_value = "60")]
    duration: f64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pace the loop to wall-clock time
    #[arg(long)]
    realtime: bool,

    /// Fill acceleration/brake/steering with legacy random noise
    #[arg(long)]
    synthetic_telemetry: bool,

    /// Flip all lights every 20 seconds instead of per-light timing
    #[arg(long)]
    global_toggle_lights: bool,

    /// Print the safety report as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let scenario = match &cli.scenario {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scenario {}", path.display()))?;
            Scenario::from_json(&json)
                .with_context(|| format!("Failed to load scenario {}", path.display()))?
        }
        None => Scenario::demo(),
    };
    info!("Loaded scenario '{}'", scenario.name);

    let config = RunConfig {
        vehicle_count: cli.vehicles,
        duration_secs: cli.duration,
        seed: cli.seed,
        pacing: if cli.realtime {
            Pacing::RealTime
        } else {
            Pacing::Unpaced
        },
        telemetry_mode: if cli.synthetic_telemetry {
            TelemetryMode::Synthetic
        } else {
            TelemetryMode::Kinematic
        },
        light_cycling: if cli.global_toggle_lights {
            LightCycling::GlobalToggle
        } else {
            LightCycling::Timed
        },
        ..RunConfig::default()
    };

    let mut run = SimulationRun::new(scenario, config);
    let mut sink = LogSink::default();
    let mut tracker = RecordingTracker::default();

    let outcome = run.execute(&mut sink, &mut tracker)?;
    let report = &outcome.report;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("=== Safety Report ===");
        println!("Overall safety score: {:.1}", report.overall_safety_score);
        println!("Near misses: {}", report.near_miss_count);
        println!("Hazard exposure: {:.1}", report.hazard_exposure_score);
        println!(
            "Hard-braking events on map: {}",
            report.collision_heatmap.total()
        );
        for spot in report.hotspots(5) {
            println!(
                "  cell ({}, {}): {} events",
                spot.row, spot.col, spot.count
            );
        }
        println!("Samples: {}", outcome.summary.samples);
    }

    Ok(())
}
