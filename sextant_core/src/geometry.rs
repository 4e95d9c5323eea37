// sextant_core/src/geometry.rs

//! 2D rigid-body algebra for planar robots.
//!
//! `Pose2` wraps an `Isometry2<f64>` (translation + `UnitComplex` heading) and
//! `Twist2` is a body-frame displacement `(dx, dy, dtheta)`. The exponential map
//! turns a twist into a pose delta along a constant-curvature arc, and the
//! logarithm recovers the twist that would produce a given delta.

use nalgebra::{Isometry2, Translation2, UnitComplex, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Mul;

/// Below this magnitude of `dtheta` the series expansions of exp/log are used.
const SMALL_ANGLE: f64 = 1e-9;

/// Wraps an angle in radians to `(-pi, pi]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

/// A body-frame displacement: forward `dx`, leftward `dy`, counter-clockwise `dtheta`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2 {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

impl Twist2 {
    pub const ZERO: Twist2 = Twist2 {
        dx: 0.0,
        dy: 0.0,
        dtheta: 0.0,
    };

    pub fn new(dx: f64, dy: f64, dtheta: f64) -> Self {
        Self { dx, dy, dtheta }
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.dx, self.dy, self.dtheta)
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.dx * factor, self.dy * factor, self.dtheta * factor)
    }

    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite() && self.dtheta.is_finite()
    }
}

/// A planar pose `(x, y, heading)` in the field frame.
///
/// Poses double as rigid transforms: `a.compose(&b)` (also `a * b`) applies `b`
/// expressed in `a`'s frame, and `a.relative(&b)` is the transform taking `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    iso: Isometry2<f64>,
}

impl Default for Pose2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose2 {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            iso: Isometry2::from_parts(Translation2::new(x, y), UnitComplex::new(heading)),
        }
    }

    pub fn identity() -> Self {
        Self {
            iso: Isometry2::identity(),
        }
    }

    pub fn from_parts(translation: Vector2<f64>, rotation: UnitComplex<f64>) -> Self {
        Self {
            iso: Isometry2::from_parts(Translation2::from(translation), rotation),
        }
    }

    pub fn from_isometry(iso: Isometry2<f64>) -> Self {
        Self { iso }
    }

    pub fn as_isometry(&self) -> &Isometry2<f64> {
        &self.iso
    }

    pub fn x(&self) -> f64 {
        self.iso.translation.vector.x
    }

    pub fn y(&self) -> f64 {
        self.iso.translation.vector.y
    }

    /// Heading in radians, always in `(-pi, pi]`.
    pub fn heading(&self) -> f64 {
        let angle = self.iso.rotation.angle();
        if angle <= -PI {
            PI
        } else {
            angle
        }
    }

    pub fn translation(&self) -> Vector2<f64> {
        self.iso.translation.vector
    }

    pub fn rotation(&self) -> UnitComplex<f64> {
        self.iso.rotation
    }

    /// Returns a copy with the same translation and a new heading.
    pub fn with_heading(&self, heading: f64) -> Self {
        Self::from_parts(self.translation(), UnitComplex::new(heading))
    }

    /// `self ⊕ other`.
    pub fn compose(&self, other: &Pose2) -> Pose2 {
        Pose2 {
            iso: self.iso * other.iso,
        }
    }

    pub fn inverse(&self) -> Pose2 {
        Pose2 {
            iso: self.iso.inverse(),
        }
    }

    /// The transform from `self` to `other`, i.e. `self⁻¹ ⊕ other`.
    pub fn relative(&self, other: &Pose2) -> Pose2 {
        Pose2 {
            iso: self.iso.inv_mul(&other.iso),
        }
    }

    /// The transform as a `(x, y, heading)` vector.
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x(), self.y(), self.heading())
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Moves along the constant-curvature arc described by `twist`, starting from `self`.
    pub fn exp(&self, twist: &Twist2) -> Pose2 {
        self.compose(&Pose2::exp_delta(twist))
    }

    /// The pose delta produced by following `twist` from the origin.
    pub fn exp_delta(twist: &Twist2) -> Pose2 {
        let Twist2 { dx, dy, dtheta } = *twist;
        let (sin_theta, cos_theta) = dtheta.sin_cos();

        let (s, c) = if dtheta.abs() < SMALL_ANGLE {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (sin_theta / dtheta, (1.0 - cos_theta) / dtheta)
        };

        Pose2::from_parts(
            Vector2::new(dx * s - dy * c, dx * c + dy * s),
            UnitComplex::from_cos_sin_unchecked(cos_theta, sin_theta),
        )
    }

    /// The twist that carries `self` onto `end`.
    pub fn log(&self, end: &Pose2) -> Twist2 {
        Pose2::log_delta(&self.relative(end))
    }

    /// The twist whose exponential is `delta`.
    pub fn log_delta(delta: &Pose2) -> Twist2 {
        let dtheta = delta.heading();
        let half_dtheta = 0.5 * dtheta;
        let rotation = delta.rotation();
        let cos_minus_one = rotation.cos_angle() - 1.0;

        let half_theta_by_tan_of_half_dtheta = if cos_minus_one.abs() < SMALL_ANGLE {
            1.0 - dtheta * dtheta / 12.0
        } else {
            -(half_dtheta * rotation.sin_angle()) / cos_minus_one
        };

        let t = delta.translation();
        let a = half_theta_by_tan_of_half_dtheta;
        Twist2::new(
            a * t.x + half_dtheta * t.y,
            -half_dtheta * t.x + a * t.y,
            dtheta,
        )
    }

    /// Linear interpolation on translation and shortest-arc interpolation on heading.
    /// `t` is clamped to `[0, 1]`.
    pub fn interpolate(&self, end: &Pose2, t: f64) -> Pose2 {
        let t = t.clamp(0.0, 1.0);
        let translation = self.translation().lerp(&end.translation(), t);
        let rotation = self.rotation().slerp(&end.rotation(), t);
        Pose2::from_parts(translation, rotation)
    }

    /// Straight-line distance between the two translations.
    pub fn distance(&self, other: &Pose2) -> f64 {
        (self.translation() - other.translation()).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x().is_finite() && self.y().is_finite() && self.heading().is_finite()
    }
}

impl Mul for Pose2 {
    type Output = Pose2;

    fn mul(self, rhs: Pose2) -> Pose2 {
        self.compose(&rhs)
    }
}

impl Serialize for Pose2 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        [self.x(), self.y(), self.heading()].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Pose2 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [x, y, heading] = <[f64; 3]>::deserialize(deserializer)?;
        Ok(Pose2::new(x, y, heading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn assert_pose_eq(a: &Pose2, b: &Pose2, epsilon: f64) {
        assert_abs_diff_eq!(a.x(), b.x(), epsilon = epsilon);
        assert_abs_diff_eq!(a.y(), b.y(), epsilon = epsilon);
        assert_abs_diff_eq!(wrap_angle(a.heading() - b.heading()), 0.0, epsilon = epsilon);
    }

    #[test]
    fn wrap_angle_keeps_half_open_interval() {
        assert_abs_diff_eq!(wrap_angle(PI), PI, epsilon = EPS);
        assert_abs_diff_eq!(wrap_angle(-PI), PI, epsilon = EPS);
        assert_abs_diff_eq!(wrap_angle(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = EPS);
        assert_abs_diff_eq!(wrap_angle(0.25), 0.25, epsilon = EPS);
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let pose = Pose2::new(1.5, -2.0, 0.7);
        let identity = pose.compose(&pose.inverse());
        assert_pose_eq(&identity, &Pose2::identity(), EPS);
        assert_pose_eq(&(pose.inverse() * pose), &Pose2::identity(), EPS);
    }

    #[test]
    fn relative_then_compose_recovers_target() {
        let a = Pose2::new(1.0, 2.0, 0.3);
        let b = Pose2::new(-0.5, 4.0, -2.9);
        assert_pose_eq(&a.compose(&a.relative(&b)), &b, EPS);
    }

    #[test]
    fn exp_of_pure_translation_is_exact() {
        let delta = Pose2::exp_delta(&Twist2::new(0.4, -0.2, 0.0));
        assert_pose_eq(&delta, &Pose2::new(0.4, -0.2, 0.0), EPS);
    }

    #[test]
    fn exp_of_pure_rotation_is_exact() {
        let delta = Pose2::exp_delta(&Twist2::new(0.0, 0.0, 1.2));
        assert_pose_eq(&delta, &Pose2::new(0.0, 0.0, 1.2), EPS);
    }

    #[test]
    fn exp_follows_quarter_circle_arc() {
        // Driving a quarter circle of radius 1 ends at (1, 1) facing +y.
        let delta = Pose2::exp_delta(&Twist2::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        assert_pose_eq(&delta, &Pose2::new(1.0, 1.0, FRAC_PI_2), 1e-9);
    }

    #[test]
    fn log_round_trips_arbitrary_poses() {
        let cases = [
            (Pose2::new(0.0, 0.0, 0.0), Pose2::new(1.0, 0.5, 0.2)),
            (Pose2::new(3.0, -1.0, 2.5), Pose2::new(2.0, 2.0, -2.5)),
            (Pose2::new(-1.0, 1.0, -0.1), Pose2::new(-1.0, 1.0, -0.1)),
            (Pose2::new(0.2, 0.1, 1.0), Pose2::new(0.2, 0.1, 1.0 + 1e-12)),
        ];
        for (a, b) in cases {
            let twist = a.log(&b);
            assert_pose_eq(&a.exp(&twist), &b, 1e-9);
        }
    }

    #[test]
    fn interpolate_takes_shortest_arc() {
        let a = Pose2::new(0.0, 0.0, 3.0);
        let b = Pose2::new(2.0, 4.0, -3.0);
        let mid = a.interpolate(&b, 0.5);
        assert_abs_diff_eq!(mid.x(), 1.0, epsilon = EPS);
        assert_abs_diff_eq!(mid.y(), 2.0, epsilon = EPS);
        // The short way round from 3.0 to -3.0 passes through pi.
        assert_abs_diff_eq!(wrap_angle(mid.heading() - PI), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn half_turn_heading_is_positive_pi() {
        assert_eq!(Pose2::new(0.0, 0.0, -PI).heading(), PI);
        let quarter = Pose2::new(0.0, 0.0, -FRAC_PI_2);
        let h = quarter.compose(&quarter).heading();
        assert!(h > -PI && h <= PI);
        assert_abs_diff_eq!(h, PI, epsilon = EPS);
    }

    #[test]
    fn heading_is_wrapped_after_composition() {
        let a = Pose2::new(0.0, 0.0, 3.0);
        let b = Pose2::new(0.0, 0.0, 0.5);
        let h = a.compose(&b).heading();
        assert!(h > -PI && h <= PI);
        assert_abs_diff_eq!(h, wrap_angle(3.5), epsilon = EPS);
    }
}
