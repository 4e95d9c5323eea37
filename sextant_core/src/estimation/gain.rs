// sextant_core/src/estimation/gain.rs

use dyn_clone::DynClone;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::messages::NoiseVector;

// --- CONFIDENCE POLICY TRAIT ---
// Maps an absolute measurement's noise into a per-axis correction gain.
pub trait ConfidencePolicy: DynClone + Debug + Send + Sync {
    /// Per-axis gain `(x, y, heading)`, each in `[0, 1]`.
    ///
    /// An invalid noise vector (non-finite or non-positive component) must
    /// yield a zero gain so the measurement is ignored.
    fn gain(&self, noise: &NoiseVector) -> Vector3<f64>;

    fn name(&self) -> &'static str;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn ConfidencePolicy>`.
dyn_clone::clone_trait_object!(ConfidencePolicy);

/// Steady-state filter gain: `q / (q + r)` per axis, where `q` is the odometry
/// process variance and `r` the measurement variance.
#[derive(Debug, Clone)]
pub struct SteadyStateGain {
    process_variance: Vector3<f64>,
}

impl SteadyStateGain {
    /// `process_std_devs` is the assumed odometry drift per axis.
    pub fn new(process_std_devs: [f64; 3]) -> Self {
        Self {
            process_variance: Vector3::from_iterator(process_std_devs.iter().map(|s| s * s)),
        }
    }
}

impl ConfidencePolicy for SteadyStateGain {
    fn gain(&self, noise: &NoiseVector) -> Vector3<f64> {
        if !noise.is_valid() {
            return Vector3::zeros();
        }
        let measurement = noise.to_vector();
        Vector3::from_fn(|i, _| {
            let q = self.process_variance[i];
            if q == 0.0 {
                return 0.0;
            }
            let r = measurement[i] * measurement[i];
            (q / (q + r)).clamp(0.0, 1.0)
        })
    }

    fn name(&self) -> &'static str {
        "steady_state"
    }
}

/// Heuristic confidence: `1 / (1 + mean(noise))`, applied to every axis.
#[derive(Debug, Clone, Default)]
pub struct HeuristicGain;

impl ConfidencePolicy for HeuristicGain {
    fn gain(&self, noise: &NoiseVector) -> Vector3<f64> {
        if !noise.is_valid() {
            return Vector3::zeros();
        }
        let g = (1.0 / (1.0 + noise.mean())).clamp(0.0, 1.0);
        Vector3::repeat(g)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Which confidence policy the engine is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainStrategy {
    #[default]
    SteadyState,
    Heuristic,
}

impl GainStrategy {
    pub fn build(self, process_std_devs: [f64; 3]) -> Box<dyn ConfidencePolicy> {
        match self {
            GainStrategy::SteadyState => Box::new(SteadyStateGain::new(process_std_devs)),
            GainStrategy::Heuristic => Box::new(HeuristicGain),
        }
    }
}
