// sextant_sim/examples/01_full_pipeline.rs

//! An end-to-end run of the fusion pipeline, comparing both gain policies.
//!
//! This example demonstrates how to:
//! 1. Load a scenario from a TOML file.
//! 2. Run it once per confidence policy.
//! 3. Inspect the fused estimate and landmark bookkeeping afterwards.
//!
//! To run this example:
//! `cargo run -p sextant_sim --example 01_full_pipeline`

use std::path::Path;

use tracing::info;

use sextant_core::estimation::gain::GainStrategy;
use sextant_sim::config::{load_scenario, SimError};
use sextant_sim::logging::init_logging;
use sextant_sim::runner::Simulation;

fn main() -> Result<(), SimError> {
    init_logging(Some("info"));

    // --- 1. Load Simulation Configuration ---
    let scenario_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/scenarios/default.toml");
    let base = load_scenario(&scenario_path)?;

    // --- 2. Run once per policy, same seed ---
    for strategy in [GainStrategy::SteadyState, GainStrategy::Heuristic] {
        let mut config = base.clone();
        config.estimator.gain_strategy = strategy;

        let simulation = Simulation::new(config)?;
        let summary = simulation.run()?;
        info!("{strategy:?}:\n{summary}");

        // --- 3. Telemetry reads after the run ---
        let engine = simulation.engine();
        let end = summary.duration_secs;
        info!(
            "  visible at end: {:?}, field velocity: {:?}",
            engine.visible_landmarks(end),
            engine.field_velocity()
        );
    }
    Ok(())
}
