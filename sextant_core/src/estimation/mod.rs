// sextant_core/src/estimation/mod.rs

use crate::estimation::fusion::Correction;
use crate::geometry::Pose2;
use crate::messages::{AbsoluteObservation, OdometryObservation};

/// The contract for anything that fuses drivetrain odometry with delayed
/// absolute fixes. Shared between producer threads, so every method takes `&self`.
pub trait PoseEstimator: Send + Sync {
    fn add_odometry_observation(&self, observation: &OdometryObservation);

    fn add_absolute_observation(&self, observation: &AbsoluteObservation) -> Correction;

    /// The current best estimate of the field pose.
    fn estimated_pose(&self) -> Pose2;
}

pub mod engine;
pub mod fusion;
pub mod gain;
pub mod history;
