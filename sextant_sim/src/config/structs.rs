// sextant_sim/src/config/structs.rs

use serde::{Deserialize, Serialize};

use sextant_core::config::EstimatorConfig;
use sextant_core::geometry::Pose2;
use sextant_core::messages::ChassisSpeeds;
use sextant_core::models::vision_noise::VisionNoiseModel;
use sextant_core::types::LandmarkId;

use crate::utils::serde_helpers;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// Everything needed to run one simulation. This struct is the root of the
/// data parsed from a `scenario.toml` file; every section may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Where the robot starts and where the estimator is reset to, `[x, y, heading_deg]`.
    #[serde(with = "serde_helpers::pose_from_deg_array")]
    pub start_pose: Pose2,
    pub simulation: SimulationSection,
    pub estimator: EstimatorConfig,
    pub drivetrain: DrivetrainConfig,
    pub vision: VisionConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario file.
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    /// Seed for the simulation PRNG.
    pub seed: u64,
    /// Length of the run in seconds.
    pub duration_secs: f64,
    /// Control loop frequency; one odometry observation per cycle.
    pub control_rate_hz: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 42,
            duration_secs: 20.0,
            control_rate_hz: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrivetrainConfig {
    /// The commanded motion, played back in order.
    pub segments: Vec<CommandSegment>,
    /// Start again from the first segment once the last one ends.
    pub repeat: bool,
    /// Per-cycle random wheel slip, as a fraction of the distance rolled.
    pub slip_std_dev: f64,
    /// Systematic wheel scale error, e.g. `0.03` reports 3% more travel than happened.
    pub slip_bias: f64,
    pub gyro: GyroConfig,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            segments: vec![CommandSegment {
                duration_secs: 10.0,
                vx: 1.0,
                vy: 0.0,
                omega: 0.4,
            }],
            repeat: true,
            slip_std_dev: 0.02,
            slip_bias: 0.0,
            gyro: GyroConfig::default(),
        }
    }
}

/// Constant body-frame speeds held for `duration_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSegment {
    pub duration_secs: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    /// Turn rate, written in degrees per second.
    #[serde(
        default,
        rename = "omega_deg_per_sec",
        with = "serde_helpers::radians_from_deg"
    )]
    pub omega: f64,
}

impl CommandSegment {
    pub fn speeds(&self) -> ChassisSpeeds {
        ChassisSpeeds::new(self.vx, self.vy, self.omega)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GyroConfig {
    pub enabled: bool,
    #[serde(rename = "noise_std_deg", with = "serde_helpers::radians_from_deg")]
    pub noise_std: f64,
    #[serde(rename = "drift_deg_per_sec", with = "serde_helpers::radians_from_deg")]
    pub drift_rate: f64,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            noise_std: 0.1_f64.to_radians(),
            drift_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisionConfig {
    pub enabled: bool,
    /// Frames captured per second.
    pub rate_hz: f64,
    /// Capture-to-delivery delay in seconds.
    pub latency_secs: f64,
    /// Std dev of the robot position implied by a single landmark, metres.
    pub position_noise_std: f64,
    #[serde(rename = "heading_noise_std_deg", with = "serde_helpers::radians_from_deg")]
    pub heading_noise_std: f64,
    /// Landmarks farther than this are not detected, metres.
    pub max_range: f64,
    /// Full horizontal field of view centred on the robot's heading.
    #[serde(rename = "field_of_view_deg", with = "serde_helpers::radians_from_deg")]
    pub field_of_view: f64,
    pub noise_model: VisionNoiseModel,
    pub landmarks: Vec<LandmarkConfig>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        // A 10 m square field with a landmark at each corner and mid-side.
        let landmarks = [
            [-5.0, -5.0],
            [0.0, -5.0],
            [5.0, -5.0],
            [5.0, 0.0],
            [5.0, 5.0],
            [0.0, 5.0],
            [-5.0, 5.0],
            [-5.0, 0.0],
        ]
        .into_iter()
        .zip(1..)
        .map(|(position, id)| LandmarkConfig { id, position })
        .collect();

        Self {
            enabled: true,
            rate_hz: 15.0,
            latency_secs: 0.08,
            position_noise_std: 0.02,
            heading_noise_std: 1.0_f64.to_radians(),
            max_range: 8.0,
            field_of_view: 360.0_f64.to_radians(),
            noise_model: VisionNoiseModel::default(),
            landmarks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LandmarkConfig {
    pub id: LandmarkId,
    /// Field position `[x, y]` in metres.
    pub position: [f64; 2],
}
