// sextant_core/src/estimation/engine.rs

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use nalgebra::UnitComplex;
use tracing::info;

use crate::config::EstimatorConfig;
use crate::error::ConfigError;
use crate::estimation::fusion::{Correction, PoseFusion};
use crate::estimation::PoseEstimator;
use crate::geometry::Pose2;
use crate::landmarks::LandmarkRegistry;
use crate::messages::{
    AbsoluteObservation, ChassisSpeeds, LandmarkSighting, OdometryObservation,
};
use crate::types::{LandmarkId, Timestamp};

/// Thread-safe front of the pose fusion filter.
///
/// Every operation takes `&self`, so one engine can be shared through an `Arc`
/// between the drivetrain loop, the vision loop and any number of readers. All
/// pose state sits behind a single lock and each operation holds it for its
/// whole duration, so readers never observe a half-applied update.
#[derive(Debug)]
pub struct FusionEngine {
    state: Mutex<PoseFusion>,
    landmarks: RwLock<LandmarkRegistry>,
    landmark_stale_secs: f64,
}

impl FusionEngine {
    pub fn new(config: &EstimatorConfig) -> Result<Self, ConfigError> {
        let fusion = PoseFusion::from_config(config)?;
        info!(
            modules = fusion.kinematics().module_count(),
            policy = fusion.policy().name(),
            window = config.retention_window_secs,
            "Fusion engine created."
        );
        Ok(Self::from_fusion(fusion, config.landmark_stale_secs))
    }

    /// Wraps an already-built filter, e.g. one with a custom confidence policy.
    pub fn from_fusion(fusion: PoseFusion, landmark_stale_secs: f64) -> Self {
        Self {
            state: Mutex::new(fusion),
            landmarks: RwLock::new(LandmarkRegistry::new()),
            landmark_stale_secs,
        }
    }

    // Filter updates compute everything before writing any field, so a poisoned
    // lock still guards a consistent state.
    fn lock(&self) -> MutexGuard<'_, PoseFusion> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self, pose: Pose2) {
        self.lock().reset(pose);
    }

    pub fn add_odometry_observation(&self, observation: &OdometryObservation) {
        self.lock().add_odometry_observation(observation);
    }

    pub fn add_absolute_observation(&self, observation: &AbsoluteObservation) -> Correction {
        self.lock().add_absolute_observation(observation)
    }

    pub fn estimated_pose(&self) -> Pose2 {
        self.lock().estimated_pose()
    }

    pub fn odometry_pose(&self) -> Pose2 {
        self.lock().odometry_pose()
    }

    /// Odometry and estimated pose read under the same lock.
    pub fn poses(&self) -> (Pose2, Pose2) {
        let fusion = self.lock();
        (fusion.odometry_pose(), fusion.estimated_pose())
    }

    pub fn rotation(&self) -> UnitComplex<f64> {
        self.lock().estimated_pose().rotation()
    }

    pub fn gyro_offset(&self) -> f64 {
        self.lock().gyro_offset()
    }

    /// Odometry pose recorded at `timestamp`, if still retained.
    pub fn odometry_at(&self, timestamp: Timestamp) -> Option<Pose2> {
        self.lock().history().sample(timestamp)
    }

    /// Stores the measured body-frame velocity for telemetry.
    pub fn add_drive_speeds(&self, speeds: ChassisSpeeds) {
        self.lock().set_robot_velocity(speeds);
    }

    pub fn robot_velocity(&self) -> ChassisSpeeds {
        self.lock().robot_velocity()
    }

    pub fn field_velocity(&self) -> ChassisSpeeds {
        self.lock().field_velocity()
    }

    pub fn record_landmarks(&self, sightings: &[LandmarkSighting]) {
        let mut registry = self
            .landmarks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for sighting in sightings {
            registry.record(*sighting);
        }
    }

    /// Forgets every sighting, e.g. before a new match or simulation run.
    pub fn clear_landmarks(&self) {
        self.landmarks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// A snapshot of the landmark registry.
    pub fn landmarks(&self) -> LandmarkRegistry {
        self.landmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn visible_landmarks(&self, now: Timestamp) -> Vec<LandmarkId> {
        self.landmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .visible_at(now, self.landmark_stale_secs)
    }

    /// A copy of the filter state, for inspection or offline replay.
    pub fn snapshot(&self) -> PoseFusion {
        self.lock().clone()
    }
}

impl PoseEstimator for FusionEngine {
    fn add_odometry_observation(&self, observation: &OdometryObservation) {
        FusionEngine::add_odometry_observation(self, observation);
    }

    fn add_absolute_observation(&self, observation: &AbsoluteObservation) -> Correction {
        FusionEngine::add_absolute_observation(self, observation)
    }

    fn estimated_pose(&self) -> Pose2 {
        FusionEngine::estimated_pose(self)
    }
}
