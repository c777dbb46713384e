//! Road Safety Simulation Library
//!
//! Simulates autonomous vehicles on a 2D road scenario and scores the
//! resulting telemetry for safety risk.

pub mod simulation;
