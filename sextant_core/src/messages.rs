// sextant_core/src/messages.rs

use crate::geometry::{Pose2, Twist2};
use crate::types::{LandmarkId, Timestamp};
use nalgebra::{UnitComplex, Vector2, Vector3};
use serde::{Deserialize, Serialize};

// =========================================================================
// == Drivetrain Data Structures ==
// =========================================================================

/// One module's accumulated travel at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModulePosition {
    /// Total distance the wheel has rolled, in metres.
    pub distance: f64,
    /// Steering angle in the body frame. `None` for a fixed wheel pointing along +x.
    pub angle: Option<f64>,
}

impl ModulePosition {
    pub fn new(distance: f64, angle: Option<f64>) -> Self {
        Self { distance, angle }
    }

    pub fn fixed(distance: f64) -> Self {
        Self {
            distance,
            angle: None,
        }
    }

    /// The unit vector the wheel rolls along, in the body frame.
    pub fn direction(&self) -> Vector2<f64> {
        match self.angle {
            Some(angle) => {
                let (sin, cos) = angle.sin_cos();
                Vector2::new(cos, sin)
            }
            None => Vector2::x(),
        }
    }
}

/// All module positions sampled at one instant, in the kinematics model's module order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelSnapshot {
    pub modules: Vec<ModulePosition>,
}

impl WheelSnapshot {
    pub fn new(modules: Vec<ModulePosition>) -> Self {
        Self { modules }
    }

    /// A snapshot with every module at zero distance and no steering reading.
    pub fn zeros(module_count: usize) -> Self {
        Self {
            modules: vec![ModulePosition::default(); module_count],
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Measured body-frame velocity of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forward velocity, m/s.
    pub vx: f64,
    /// Leftward velocity, m/s.
    pub vy: f64,
    /// Counter-clockwise angular velocity, rad/s.
    pub omega: f64,
}

impl ChassisSpeeds {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Rotates body-relative speeds into the field frame given the robot heading.
    pub fn to_field_relative(&self, heading: &UnitComplex<f64>) -> ChassisSpeeds {
        let v = heading.transform_vector(&Vector2::new(self.vx, self.vy));
        ChassisSpeeds::new(v.x, v.y, self.omega)
    }

    /// The body-frame displacement produced by holding these speeds for `dt` seconds.
    pub fn to_twist(&self, dt: f64) -> Twist2 {
        Twist2::new(self.vx * dt, self.vy * dt, self.omega * dt)
    }

    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.omega.is_finite()
    }
}

// =========================================================================
// == Observation Messages ==
// =========================================================================

/// Produced by the drivetrain once per control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct OdometryObservation {
    pub wheels: WheelSnapshot,
    /// Raw gyro yaw in the gyro's own zero, radians. `None` when the gyro is disconnected.
    pub gyro_heading: Option<f64>,
    pub timestamp: Timestamp,
}

/// Per-axis standard deviations `(x, y, heading)` attached to an absolute measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseVector {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl NoiseVector {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// The value producers use to mark a measurement as too poor to use at all.
    pub fn reject() -> Self {
        Self::uniform(f64::MAX)
    }

    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.theta)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.theta * factor)
    }

    /// Every component must be finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.theta]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// Mean of the three components. Summed in thirds so the reject marker stays finite.
    pub fn mean(&self) -> f64 {
        self.x / 3.0 + self.y / 3.0 + self.theta / 3.0
    }
}

/// A landmark-based pose solution, stamped with capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsoluteObservation {
    pub pose: Pose2,
    pub timestamp: Timestamp,
    pub noise: NoiseVector,
}

/// One landmark seen by the vision collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkSighting {
    pub id: LandmarkId,
    /// Field pose of the robot implied by this landmark alone.
    pub pose: Pose2,
    /// Camera-to-landmark distance, metres.
    pub distance: f64,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn field_relative_rotates_translation_only() {
        let speeds = ChassisSpeeds::new(1.0, 0.0, 0.5);
        let field = speeds.to_field_relative(&UnitComplex::new(FRAC_PI_2));
        assert_abs_diff_eq!(field.vx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(field.vy, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(field.omega, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn noise_vector_validity() {
        assert!(NoiseVector::new(0.1, 0.2, 0.3).is_valid());
        assert!(!NoiseVector::new(0.0, 0.2, 0.3).is_valid());
        assert!(!NoiseVector::new(0.1, -1.0, 0.3).is_valid());
        assert!(!NoiseVector::new(0.1, 0.2, f64::NAN).is_valid());
        assert!(!NoiseVector::uniform(f64::INFINITY).is_valid());
        // The reject marker is finite, so policies map it to a vanishing gain instead.
        assert!(NoiseVector::reject().is_valid());
    }

    #[test]
    fn fixed_module_rolls_forward() {
        let module = ModulePosition::fixed(1.0);
        assert_eq!(module.direction(), Vector2::x());
    }
}
