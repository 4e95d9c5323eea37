// sextant_core/src/models/vision_noise.rs

use serde::{Deserialize, Serialize};

use crate::messages::NoiseVector;

/// Producer-side noise inflation for landmark-based pose solutions.
///
/// The fusion engine consumes whatever noise it is handed; vision collaborators
/// use this model to scale their base std devs by how many landmarks they saw
/// and how far away those landmarks were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisionNoiseModel {
    /// Std devs `(x, y, heading)` for a solution from a single landmark.
    pub single_landmark_std_devs: [f64; 3],
    /// Std devs for a solution using two or more landmarks.
    pub multi_landmark_std_devs: [f64; 3],
    /// A lone landmark farther than this (metres) is not trusted at all.
    pub max_single_distance: f64,
    /// Noise grows by `1 + d² / distance_scale`.
    pub distance_scale: f64,
}

impl Default for VisionNoiseModel {
    fn default() -> Self {
        Self {
            single_landmark_std_devs: [4.0, 4.0, 8.0],
            multi_landmark_std_devs: [2.0, 2.0, 4.0],
            max_single_distance: 4.0,
            distance_scale: 30.0,
        }
    }
}

impl VisionNoiseModel {
    /// Noise for a solution built from `landmark_count` landmarks at `average_distance`.
    pub fn noise_for(&self, landmark_count: usize, average_distance: f64) -> NoiseVector {
        if landmark_count == 0 {
            return NoiseVector::from_array(self.single_landmark_std_devs);
        }
        if !average_distance.is_finite() {
            return NoiseVector::reject();
        }
        if landmark_count == 1 && average_distance > self.max_single_distance {
            return NoiseVector::reject();
        }

        let base = if landmark_count > 1 {
            self.multi_landmark_std_devs
        } else {
            self.single_landmark_std_devs
        };
        let scale = 1.0 + average_distance * average_distance / self.distance_scale;
        NoiseVector::from_array(base).scaled(scale)
    }
}
