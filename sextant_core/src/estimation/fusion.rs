// sextant_core/src/estimation/fusion.rs

use nalgebra::{UnitComplex, Vector3};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::EstimatorConfig;
use crate::error::ConfigError;
use crate::estimation::gain::ConfidencePolicy;
use crate::estimation::history::PoseHistory;
use crate::geometry::Pose2;
use crate::messages::{AbsoluteObservation, ChassisSpeeds, OdometryObservation, WheelSnapshot};
use crate::models::kinematics::ModuleKinematics;
use crate::types::Timestamp;

/// Why an absolute observation was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DropReason {
    #[error("no odometry has been recorded since the last reset")]
    EmptyHistory,
    #[error("capture time {timestamp:.3}s is older than the retention window (oldest usable {oldest_usable:.3}s)")]
    Stale {
        timestamp: Timestamp,
        oldest_usable: Timestamp,
    },
    #[error("capture time {timestamp:.3}s is not covered by recorded odometry")]
    Uncovered { timestamp: Timestamp },
    #[error("observation contains non-finite values")]
    NonFinite,
}

/// What happened to an absolute observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    Applied {
        /// Per-axis gain `(x, y, heading)` that was used.
        gain: Vector3<f64>,
        /// Measurement minus back-projected estimate, in the estimate's frame at capture time.
        delta: Vector3<f64>,
    },
    Dropped(DropReason),
}

impl Correction {
    pub fn is_applied(&self) -> bool {
        matches!(self, Correction::Applied { .. })
    }
}

/// The fusion filter itself, without any locking.
///
/// Holds the purely relative odometry pose and the fused estimate. Odometry
/// moves both by the same relative motion; absolute observations are applied
/// at their capture time and the odometry recorded since is replayed on top.
#[derive(Debug, Clone)]
pub struct PoseFusion {
    kinematics: ModuleKinematics,
    policy: Box<dyn ConfidencePolicy>,
    history: PoseHistory,
    odometry_pose: Pose2,
    estimated_pose: Pose2,
    /// Maps the gyro's native zero onto the field frame.
    gyro_offset: UnitComplex<f64>,
    last_wheels: Option<WheelSnapshot>,
    robot_velocity: ChassisSpeeds,
}

impl PoseFusion {
    pub fn new(
        kinematics: ModuleKinematics,
        policy: Box<dyn ConfidencePolicy>,
        retention_window_secs: f64,
    ) -> Self {
        Self {
            kinematics,
            policy,
            history: PoseHistory::new(retention_window_secs),
            odometry_pose: Pose2::identity(),
            estimated_pose: Pose2::identity(),
            gyro_offset: UnitComplex::identity(),
            last_wheels: None,
            robot_velocity: ChassisSpeeds::default(),
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config.kinematics()?,
            config.confidence_policy(),
            config.retention_window_secs,
        ))
    }

    pub fn odometry_pose(&self) -> Pose2 {
        self.odometry_pose
    }

    pub fn estimated_pose(&self) -> Pose2 {
        self.estimated_pose
    }

    pub fn gyro_offset(&self) -> f64 {
        self.gyro_offset.angle()
    }

    pub fn history(&self) -> &PoseHistory {
        &self.history
    }

    pub fn kinematics(&self) -> &ModuleKinematics {
        &self.kinematics
    }

    pub fn policy(&self) -> &dyn ConfidencePolicy {
        self.policy.as_ref()
    }

    pub fn robot_velocity(&self) -> ChassisSpeeds {
        self.robot_velocity
    }

    /// Measured body velocity rotated into the field frame by the estimated heading.
    pub fn field_velocity(&self) -> ChassisSpeeds {
        self.robot_velocity
            .to_field_relative(&self.estimated_pose.rotation())
    }

    pub fn set_robot_velocity(&mut self, speeds: ChassisSpeeds) {
        self.robot_velocity = speeds;
    }

    /// Places the robot at `pose` and forgets all recorded odometry.
    ///
    /// The gyro offset is recomputed so the gyro's current reading keeps mapping
    /// to `pose`'s heading. The wheel baseline is kept.
    pub fn reset(&mut self, pose: Pose2) {
        // odometry heading minus the old offset is the last raw gyro reading
        let raw_gyro = self.odometry_pose.rotation() * self.gyro_offset.inverse();
        self.gyro_offset = pose.rotation() * raw_gyro.inverse();
        self.odometry_pose = pose;
        self.estimated_pose = pose;
        self.history.clear();
        info!(
            x = pose.x(),
            y = pose.y(),
            heading = pose.heading(),
            "Pose reset."
        );
    }

    pub fn add_odometry_observation(&mut self, observation: &OdometryObservation) {
        // 1. Wheel motion since the last snapshot. The first snapshot only sets the baseline.
        let twist = match &self.last_wheels {
            Some(last) => self.kinematics.twist_between(last, &observation.wheels),
            None => Default::default(),
        };

        // 2. Integrate along the arc.
        let last_odometry_pose = self.odometry_pose;
        let mut odometry_pose = last_odometry_pose.exp(&twist);

        // 3. The gyro owns heading whenever it is connected.
        if let Some(gyro) = observation.gyro_heading.filter(|g| g.is_finite()) {
            let heading = UnitComplex::new(gyro) * self.gyro_offset;
            odometry_pose = Pose2::from_parts(odometry_pose.translation(), heading);
        }

        // 4. The estimate moves by the same relative motion.
        let step = last_odometry_pose.log(&odometry_pose);
        let estimated_pose = self.estimated_pose.exp(&step);

        // 5. Commit, and record the pose for later corrections.
        self.last_wheels = Some(observation.wheels.clone());
        self.odometry_pose = odometry_pose;
        self.estimated_pose = estimated_pose;
        self.history.insert(observation.timestamp, odometry_pose);

        trace!(
            t = observation.timestamp,
            dx = step.dx,
            dy = step.dy,
            dtheta = step.dtheta,
            "Odometry update."
        );
    }

    pub fn add_absolute_observation(&mut self, observation: &AbsoluteObservation) -> Correction {
        let outcome = self.apply_absolute_observation(observation);
        match &outcome {
            Correction::Applied { gain, delta } => debug!(
                t = observation.timestamp,
                gain = ?gain.as_slice(),
                delta = ?delta.as_slice(),
                "Absolute observation applied."
            ),
            Correction::Dropped(reason) => debug!(
                t = observation.timestamp,
                %reason,
                "Absolute observation dropped."
            ),
        }
        outcome
    }

    fn apply_absolute_observation(&mut self, observation: &AbsoluteObservation) -> Correction {
        if !(observation.pose.is_finite() && observation.timestamp.is_finite()) {
            return Correction::Dropped(DropReason::NonFinite);
        }

        // 1. Too old to place inside the retained odometry.
        let Some(newest) = self.history.newest_timestamp() else {
            return Correction::Dropped(DropReason::EmptyHistory);
        };
        if self.history.is_stale(observation.timestamp) {
            return Correction::Dropped(DropReason::Stale {
                timestamp: observation.timestamp,
                oldest_usable: newest - self.history.window(),
            });
        }

        // 2. Odometry pose at capture time.
        let Some(sample) = self.history.sample(observation.timestamp) else {
            return Correction::Dropped(DropReason::Uncovered {
                timestamp: observation.timestamp,
            });
        };

        // 3. Motion between capture time and now, in both directions.
        let odometry_to_sample = self.odometry_pose.relative(&sample);
        let sample_to_odometry = odometry_to_sample.inverse();

        // 4. Where the fused estimate was at capture time.
        let estimate_at_time = self.estimated_pose.compose(&odometry_to_sample);

        // 5. How far the measurement disagrees with it.
        let delta = estimate_at_time.relative(&observation.pose).to_vector();

        // 6. Weight each axis.
        let gain = self.policy.gain(&observation.noise);
        let scaled = Pose2::from_vector(&delta.component_mul(&gain));

        // 7. Correct at capture time, then replay the odometry recorded since.
        self.estimated_pose = estimate_at_time
            .compose(&scaled)
            .compose(&sample_to_odometry);

        Correction::Applied { gain, delta }
    }
}
