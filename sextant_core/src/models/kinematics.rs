// sextant_core/src/models/kinematics.rs

use nalgebra::{DMatrix, DVector, Vector2};
use tracing::warn;

use crate::error::KinematicsError;
use crate::geometry::Twist2;
use crate::messages::{ChassisSpeeds, WheelSnapshot};

/// Singular values below this mark a layout that cannot observe planar motion.
const RANK_EPS: f64 = 1e-9;

/// Rigid-body kinematics for an arbitrary layout of wheel modules.
///
/// Each module at body position `(x_i, y_i)` moves by
/// `[1, 0, -y_i; 0, 1, x_i] * [dx, dy, dtheta]`. Stacking the rows for every
/// module gives the inverse kinematics matrix `A` (2N x 3); the body twist is
/// recovered as the least-squares solution `(AᵀA)⁻¹Aᵀ * d`.
#[derive(Debug, Clone)]
pub struct ModuleKinematics {
    translations: Vec<Vector2<f64>>,
    inverse: DMatrix<f64>,
    forward: DMatrix<f64>,
}

impl ModuleKinematics {
    pub fn new(translations: Vec<Vector2<f64>>) -> Result<Self, KinematicsError> {
        if translations.is_empty() {
            return Err(KinematicsError::NoModules);
        }
        if translations.iter().any(|t| !(t.x.is_finite() && t.y.is_finite())) {
            return Err(KinematicsError::NonFiniteTranslation);
        }

        let n = translations.len();
        let mut inverse = DMatrix::zeros(2 * n, 3);
        for (i, t) in translations.iter().enumerate() {
            inverse[(2 * i, 0)] = 1.0;
            inverse[(2 * i, 2)] = -t.y;
            inverse[(2 * i + 1, 1)] = 1.0;
            inverse[(2 * i + 1, 2)] = t.x;
        }

        let rank = inverse.clone().svd(false, false).rank(RANK_EPS);
        if rank < 3 {
            return Err(KinematicsError::RankDeficient { rank });
        }

        // Full column rank makes the 3x3 normal matrix symmetric positive definite.
        let transposed = inverse.transpose();
        let forward = (&transposed * &inverse)
            .cholesky()
            .ok_or(KinematicsError::NotPositiveDefinite)?
            .solve(&transposed);

        Ok(Self {
            translations,
            inverse,
            forward,
        })
    }

    pub fn from_arrays(translations: &[[f64; 2]]) -> Result<Self, KinematicsError> {
        Self::new(
            translations
                .iter()
                .map(|[x, y]| Vector2::new(*x, *y))
                .collect(),
        )
    }

    pub fn module_count(&self) -> usize {
        self.translations.len()
    }

    pub fn translations(&self) -> &[Vector2<f64>] {
        &self.translations
    }

    /// The body twist that best explains the change between two snapshots.
    ///
    /// Each module's displacement is its distance delta along the steering angle
    /// reported in `next`. Mismatched module counts or non-finite readings
    /// resolve to a zero twist.
    pub fn twist_between(&self, prev: &WheelSnapshot, next: &WheelSnapshot) -> Twist2 {
        let n = self.module_count();
        if prev.len() != n || next.len() != n {
            warn!(
                expected = n,
                prev = prev.len(),
                next = next.len(),
                "Wheel snapshot module count mismatch, ignoring motion."
            );
            return Twist2::ZERO;
        }

        let mut displacements = DVector::zeros(2 * n);
        for (i, (before, after)) in prev.modules.iter().zip(&next.modules).enumerate() {
            let delta = after.distance - before.distance;
            let d = after.direction() * delta;
            displacements[2 * i] = d.x;
            displacements[2 * i + 1] = d.y;
        }

        if displacements.iter().all(|d| *d == 0.0) {
            return Twist2::ZERO;
        }

        let solution = &self.forward * displacements;
        let twist = Twist2::new(solution[0], solution[1], solution[2]);
        if twist.is_finite() {
            twist
        } else {
            Twist2::ZERO
        }
    }

    /// Per-module displacement vectors, in the body frame, produced by `twist`.
    pub fn module_displacements(&self, twist: &Twist2) -> Vec<Vector2<f64>> {
        let stacked = &self.inverse * DVector::from_column_slice(twist.to_vector().as_slice());
        (0..self.module_count())
            .map(|i| Vector2::new(stacked[2 * i], stacked[2 * i + 1]))
            .collect()
    }

    /// Per-module velocity vectors for a commanded body velocity.
    pub fn to_module_velocities(&self, speeds: &ChassisSpeeds) -> Vec<Vector2<f64>> {
        self.module_displacements(&speeds.to_twist(1.0))
    }

    /// Least-squares body velocity from per-module velocity vectors.
    pub fn to_chassis_speeds(&self, module_velocities: &[Vector2<f64>]) -> ChassisSpeeds {
        if module_velocities.len() != self.module_count() {
            return ChassisSpeeds::default();
        }
        let stacked = DVector::from_iterator(
            2 * module_velocities.len(),
            module_velocities.iter().flat_map(|v| [v.x, v.y]),
        );
        let solution = &self.forward * stacked;
        ChassisSpeeds::new(solution[0], solution[1], solution[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ModulePosition;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn square_swerve() -> ModuleKinematics {
        ModuleKinematics::from_arrays(&[[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]])
            .unwrap()
    }

    fn snapshot(modules: &[(f64, Option<f64>)]) -> WheelSnapshot {
        WheelSnapshot::new(
            modules
                .iter()
                .map(|(d, a)| ModulePosition::new(*d, *a))
                .collect(),
        )
    }

    #[test]
    fn straight_drive_gives_forward_twist() {
        let kinematics = square_swerve();
        let prev = snapshot(&[(0.0, Some(0.0)); 4]);
        let next = snapshot(&[(0.1, Some(0.0)); 4]);
        let twist = kinematics.twist_between(&prev, &next);
        assert_abs_diff_eq!(twist.dx, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dy, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dtheta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn strafe_gives_sideways_twist() {
        let kinematics = square_swerve();
        let prev = snapshot(&[(0.0, Some(FRAC_PI_2)); 4]);
        let next = snapshot(&[(0.2, Some(FRAC_PI_2)); 4]);
        let twist = kinematics.twist_between(&prev, &next);
        assert_abs_diff_eq!(twist.dx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dy, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn inverse_then_forward_recovers_twist_for_uneven_layout() {
        let kinematics =
            ModuleKinematics::from_arrays(&[[0.4, 0.25], [0.35, -0.3], [-0.2, 0.33], [-0.41, -0.1]])
                .unwrap();
        let twist = Twist2::new(0.05, -0.02, 0.03);
        let displacements = kinematics.module_displacements(&twist);
        let next = WheelSnapshot::new(
            displacements
                .iter()
                .map(|d| ModulePosition::new(d.norm(), Some(d.y.atan2(d.x))))
                .collect(),
        );
        let recovered = kinematics.twist_between(&WheelSnapshot::zeros(4), &next);
        assert_abs_diff_eq!(recovered.dx, twist.dx, epsilon = 1e-12);
        assert_abs_diff_eq!(recovered.dy, twist.dy, epsilon = 1e-12);
        assert_abs_diff_eq!(recovered.dtheta, twist.dtheta, epsilon = 1e-12);
    }

    #[test]
    fn forward_is_an_exact_left_inverse() {
        let kinematics =
            ModuleKinematics::from_arrays(&[[0.4, 0.25], [0.35, -0.3], [-0.2, 0.33], [-0.41, -0.1]])
                .unwrap();
        let product = &kinematics.forward * &kinematics.inverse;
        let identity = DMatrix::<f64>::identity(3, 3);
        for (got, want) in product.iter().zip(identity.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-14);
        }
    }

    #[test]
    fn differential_drive_turns_in_place() {
        let kinematics = ModuleKinematics::from_arrays(&[[0.0, 0.25], [0.0, -0.25]]).unwrap();
        let prev = snapshot(&[(0.0, None), (0.0, None)]);
        let next = snapshot(&[(0.05, None), (-0.05, None)]);
        let twist = kinematics.twist_between(&prev, &next);
        assert_abs_diff_eq!(twist.dx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dy, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dtheta, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn zero_motion_is_zero_twist() {
        let kinematics = square_swerve();
        let still = snapshot(&[(1.5, Some(0.3)); 4]);
        assert_eq!(kinematics.twist_between(&still, &still), Twist2::ZERO);
    }

    #[test]
    fn mismatched_snapshot_is_zero_twist() {
        let kinematics = square_swerve();
        let prev = WheelSnapshot::zeros(4);
        let next = snapshot(&[(1.0, None); 3]);
        assert_eq!(kinematics.twist_between(&prev, &next), Twist2::ZERO);
    }

    #[test]
    fn non_finite_reading_is_zero_twist() {
        let kinematics = square_swerve();
        let prev = WheelSnapshot::zeros(4);
        let next = snapshot(&[(f64::NAN, None); 4]);
        assert_eq!(kinematics.twist_between(&prev, &next), Twist2::ZERO);
    }

    #[test]
    fn degenerate_layouts_are_rejected() {
        assert!(matches!(
            ModuleKinematics::new(vec![]),
            Err(KinematicsError::NoModules)
        ));
        assert!(matches!(
            ModuleKinematics::from_arrays(&[[0.2, 0.1]]),
            Err(KinematicsError::RankDeficient { .. })
        ));
    }

    #[test]
    fn chassis_speeds_round_trip() {
        let kinematics = square_swerve();
        let speeds = ChassisSpeeds::new(1.0, 0.5, -0.8);
        let recovered = kinematics.to_chassis_speeds(&kinematics.to_module_velocities(&speeds));
        assert_abs_diff_eq!(recovered.vx, speeds.vx, epsilon = 1e-12);
        assert_abs_diff_eq!(recovered.vy, speeds.vy, epsilon = 1e-12);
        assert_abs_diff_eq!(recovered.omega, speeds.omega, epsilon = 1e-12);
    }
}
