// sextant_core/src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::estimation::gain::{ConfidencePolicy, GainStrategy};
use crate::models::kinematics::ModuleKinematics;

/// # EstimatorConfig
/// Tunables for one `FusionEngine`. Every field has a default, so an empty
/// `[estimator]` table is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// How far back (seconds) odometry poses are kept for late corrections.
    pub retention_window_secs: f64,
    /// Assumed odometry drift std devs `(x, y, heading)`.
    pub odometry_std_devs: [f64; 3],
    pub gain_strategy: GainStrategy,
    /// Module mounting positions `[x, y]` in metres, body frame.
    pub module_translations: Vec<[f64; 2]>,
    /// A landmark counts as visible for this long after its last sighting.
    pub landmark_stale_secs: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            retention_window_secs: 2.0,
            odometry_std_devs: [0.003, 0.003, 0.002],
            gain_strategy: GainStrategy::SteadyState,
            module_translations: vec![[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
            landmark_stale_secs: 0.5,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.retention_window_secs.is_finite() && self.retention_window_secs > 0.0) {
            return Err(ConfigError::InvalidRetentionWindow(
                self.retention_window_secs,
            ));
        }
        if self
            .odometry_std_devs
            .iter()
            .any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(ConfigError::InvalidOdometryStdDevs(self.odometry_std_devs));
        }
        if !(self.landmark_stale_secs.is_finite() && self.landmark_stale_secs > 0.0) {
            return Err(ConfigError::InvalidLandmarkStaleTime(
                self.landmark_stale_secs,
            ));
        }
        self.kinematics()?;
        Ok(())
    }

    pub fn kinematics(&self) -> Result<ModuleKinematics, ConfigError> {
        Ok(ModuleKinematics::from_arrays(&self.module_translations)?)
    }

    pub fn confidence_policy(&self) -> Box<dyn ConfidencePolicy> {
        self.gain_strategy.build(self.odometry_std_devs)
    }
}
