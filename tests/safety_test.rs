//! Safety analyzer tests
//!
//! Covers the heatmap, near-miss detection, hazard exposure and the overall score

use road_safety_sim::simulation::safety::{
    collision_heatmap, hazard_exposure, near_miss_count, overall_safety_score,
};
use road_safety_sim::simulation::{HeatmapConfig, Point, SafetyReport, TelemetrySample, VehicleId};

fn sample(speed: f64, brake: f64, steering: f64, x: f64, y: f64) -> TelemetrySample {
    TelemetrySample {
        vehicle_id: VehicleId(0),
        timestamp_ms: 0,
        speed,
        acceleration: 0.0,
        brake_intensity: brake,
        steering_angle: steering,
        position: Point::new(x, y),
    }
}

#[test]
fn test_near_miss_detected_on_hard_brake_after_speed() {
    let trace = [sample(12.0, 2.0, 0.0, 0.0, 0.0), sample(8.0, 8.0, 0.0, 0.0, 0.0)];
    assert_eq!(near_miss_count(&trace), 1);
}

#[test]
fn test_near_miss_needs_both_conditions() {
    let slow_then_brake = [sample(9.0, 0.0, 0.0, 0.0, 0.0), sample(5.0, 9.0, 0.0, 0.0, 0.0)];
    assert_eq!(near_miss_count(&slow_then_brake), 0);

    let fast_then_soft = [sample(20.0, 0.0, 0.0, 0.0, 0.0), sample(19.0, 7.0, 0.0, 0.0, 0.0)];
    assert_eq!(near_miss_count(&fast_then_soft), 0);

    // Only adjacent pairs count, and the first sample has no predecessor
    let first_hard = [sample(0.0, 9.0, 0.0, 0.0, 0.0)];
    assert_eq!(near_miss_count(&first_hard), 0);
    assert_eq!(near_miss_count(&[]), 0);
}

#[test]
fn test_near_miss_counts_every_pair() {
    let trace = [
        sample(15.0, 0.0, 0.0, 0.0, 0.0),
        sample(14.0, 8.0, 0.0, 0.0, 0.0),
        sample(11.0, 9.0, 0.0, 0.0, 0.0),
        sample(4.0, 9.5, 0.0, 0.0, 0.0),
    ];
    assert_eq!(near_miss_count(&trace), 3);
}

#[test]
fn test_heatmap_counts_hard_brakes_in_cells() {
    let trace = [
        sample(10.0, 6.0, 0.0, 30.0, 20.0),
        sample(10.0, 9.0, 0.0, 47.9, 31.9),
        sample(10.0, 5.0, 0.0, 30.0, 20.0),
        sample(10.0, 8.0, 0.0, 1199.0, 799.0),
    ];
    let heatmap = collision_heatmap(&trace, HeatmapConfig::default());
    assert_eq!(heatmap.grid_size, 50);
    assert_eq!(heatmap.cells.len(), 50);
    assert!(heatmap.cells.iter().all(|row| row.len() == 50));
    // 1200/50 = 24 wide, 800/50 = 16 tall
    assert_eq!(heatmap.cells[1][1], 2, "brake of exactly 5.0 is not counted");
    assert_eq!(heatmap.cells[49][49], 1);
    assert_eq!(heatmap.total(), 3);
}

#[test]
fn test_heatmap_drops_off_canvas_samples() {
    let trace = [
        sample(10.0, 9.0, 0.0, -0.5, 10.0),
        sample(10.0, 9.0, 0.0, 10.0, -0.5),
        sample(10.0, 9.0, 0.0, 1200.0, 10.0),
        sample(10.0, 9.0, 0.0, 10.0, 800.0),
        sample(10.0, 9.0, 0.0, f64::NAN, 10.0),
    ];
    let heatmap = collision_heatmap(&trace, HeatmapConfig::default());
    assert_eq!(heatmap.total(), 0);
}

#[test]
fn test_heatmap_custom_grid() {
    let config = HeatmapConfig {
        grid_size: 4,
        canvas_width: 100.0,
        canvas_height: 100.0,
    };
    let trace = [sample(10.0, 9.0, 0.0, 99.0, 0.0)];
    let heatmap = collision_heatmap(&trace, config);
    assert_eq!(heatmap.cells[0][3], 1);
}

#[test]
fn test_hazard_exposure_empty_inputs() {
    let hazards = [Point::new(0.0, 0.0)];
    let trace = [sample(10.0, 0.0, 0.0, 0.0, 0.0)];
    assert_eq!(hazard_exposure(&[], &hazards), 0.0);
    assert_eq!(hazard_exposure(&trace, &[]), 0.0);
}

#[test]
fn test_hazard_exposure_scales_and_caps() {
    let hazards = [Point::new(100.0, 100.0), Point::new(102.0, 100.0)];
    let one_of_four = [
        sample(10.0, 0.0, 0.0, 101.0, 100.0),
        sample(10.0, 0.0, 0.0, 500.0, 500.0),
        sample(10.0, 0.0, 0.0, 600.0, 500.0),
        sample(10.0, 0.0, 0.0, 700.0, 500.0),
    ];
    // Near both hazards but only counted once
    assert!((hazard_exposure(&one_of_four, &hazards) - 50.0).abs() < 1e-12);

    let mostly_exposed = [
        sample(10.0, 0.0, 0.0, 101.0, 100.0),
        sample(10.0, 0.0, 0.0, 105.0, 100.0),
        sample(10.0, 0.0, 0.0, 500.0, 500.0),
    ];
    assert_eq!(hazard_exposure(&mostly_exposed, &hazards), 100.0);
}

#[test]
fn test_safety_score_empty_trace() {
    assert_eq!(overall_safety_score(&[], 0, 0.0), 100.0);
    assert_eq!(overall_safety_score(&[], 12, 90.0), 100.0);
}

#[test]
fn test_safety_score_penalties() {
    let trace = [sample(12.0, 2.0, 0.0, 0.0, 0.0), sample(8.0, 8.0, 10.0, 0.0, 0.0)];
    // 100 - 5*1 - 0.2*20 - 2*5 - 10
    let score = overall_safety_score(&trace, 1, 20.0);
    assert!((score - 71.0).abs() < 1e-9, "score was {}", score);
}

#[test]
fn test_safety_score_clamped() {
    let trace = [sample(12.0, 10.0, -45.0, 0.0, 0.0), sample(12.0, 10.0, 45.0, 0.0, 0.0)];
    assert_eq!(overall_safety_score(&trace, 30, 100.0), 0.0);

    let calm = [sample(5.0, 0.0, 0.0, 0.0, 0.0)];
    assert_eq!(overall_safety_score(&calm, 0, 0.0), 100.0);
}

#[test]
fn test_report_combines_analyses() {
    let trace = [
        sample(12.0, 2.0, 0.0, 30.0, 20.0),
        sample(8.0, 8.0, 0.0, 30.0, 20.0),
    ];
    let hazards = [Point::new(30.0, 25.0)];
    let report = SafetyReport::analyze(&trace, &hazards, HeatmapConfig::default());

    assert_eq!(report.near_miss_count, 1);
    assert_eq!(report.hazard_exposure_score, 100.0);
    assert_eq!(report.collision_heatmap.total(), 1);
    assert!(report.overall_safety_score >= 0.0 && report.overall_safety_score <= 100.0);
}

#[test]
fn test_hotspots_sorted_by_density() {
    let trace = [
        sample(10.0, 9.0, 0.0, 30.0, 20.0),
        sample(10.0, 9.0, 0.0, 500.0, 400.0),
        sample(10.0, 9.0, 0.0, 500.0, 400.0),
        sample(10.0, 9.0, 0.0, 900.0, 100.0),
    ];
    let report = SafetyReport::analyze(&trace, &[], HeatmapConfig::default());
    let spots = report.hotspots(2);
    assert_eq!(spots.len(), 2);
    assert_eq!(spots[0].count, 2);
    assert_eq!((spots[0].row, spots[0].col), (25, 20));
    assert_eq!(spots[1].count, 1);
    assert_eq!(report.hotspots(10).len(), 3);
}
