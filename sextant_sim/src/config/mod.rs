// sextant_sim/src/config/mod.rs

//! Loading and validating scenario files.

mod structs;

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use thiserror::Error;
use tracing::info;

use sextant_core::error::ConfigError;

pub use structs::{
    CommandSegment, DrivetrainConfig, GyroConfig, LandmarkConfig, ScenarioConfig,
    SimulationSection, VisionConfig,
};

/// Environment variables with this prefix override scenario values,
/// e.g. `SEXTANT_SIMULATION__SEED=7`.
pub const ENV_PREFIX: &str = "SEXTANT_";

#[derive(Debug, Error)]
pub enum SimError {
    #[error("scenario file not found: {0}")]
    ScenarioNotFound(PathBuf),
    #[error("failed to load scenario: {0}")]
    Figment(#[from] figment::Error),
    #[error("invalid estimator configuration: {0}")]
    Estimator(#[from] ConfigError),
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("invalid noise parameter: {0}")]
    Noise(#[from] rand_distr::NormalError),
    #[error("failed to start vision thread: {0}")]
    Thread(#[from] std::io::Error),
    #[error("vision thread panicked")]
    VisionThreadPanicked,
}

/// Reads `path`, layering `SEXTANT_*` environment overrides on top.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    if !path.is_file() {
        return Err(SimError::ScenarioNotFound(path.to_path_buf()));
    }
    info!("Loading scenario from: {}", path.display());

    let config: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

/// Parses a scenario from TOML text, without environment overrides.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig, SimError> {
    let config: ScenarioConfig = Figment::new().merge(Toml::string(toml)).extract()?;
    config.validate()?;
    Ok(config)
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        self.estimator.validate()?;

        let sim = &self.simulation;
        if !positive(sim.duration_secs) {
            return Err(SimError::InvalidScenario(format!(
                "simulation.duration_secs must be positive, got {}",
                sim.duration_secs
            )));
        }
        if !positive(sim.control_rate_hz) {
            return Err(SimError::InvalidScenario(format!(
                "simulation.control_rate_hz must be positive, got {}",
                sim.control_rate_hz
            )));
        }
        if !self.start_pose.is_finite() {
            return Err(SimError::InvalidScenario(
                "start_pose must be finite".to_string(),
            ));
        }

        let drivetrain = &self.drivetrain;
        if let Some(segment) = drivetrain
            .segments
            .iter()
            .find(|s| !positive(s.duration_secs) || !s.speeds().is_finite())
        {
            return Err(SimError::InvalidScenario(format!(
                "drivetrain segment {segment:?} needs a positive duration and finite speeds"
            )));
        }
        if !non_negative(drivetrain.slip_std_dev) || !drivetrain.slip_bias.is_finite() {
            return Err(SimError::InvalidScenario(
                "drivetrain slip parameters must be finite and slip_std_dev non-negative"
                    .to_string(),
            ));
        }

        let vision = &self.vision;
        if vision.enabled {
            if !positive(vision.rate_hz) {
                return Err(SimError::InvalidScenario(format!(
                    "vision.rate_hz must be positive, got {}",
                    vision.rate_hz
                )));
            }
            if !non_negative(vision.latency_secs) {
                return Err(SimError::InvalidScenario(format!(
                    "vision.latency_secs must be non-negative, got {}",
                    vision.latency_secs
                )));
            }
            if !positive(vision.max_range) || !positive(vision.field_of_view) {
                return Err(SimError::InvalidScenario(
                    "vision.max_range and vision.field_of_view_deg must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}
