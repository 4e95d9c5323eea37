// sextant_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::abstractions::{AbsoluteMeasurementSource, OdometrySource};
pub use crate::estimation::gain::ConfidencePolicy;
pub use crate::estimation::PoseEstimator;

// --- Core Data Structures ---
pub use crate::geometry::{Pose2, Twist2};
pub use crate::messages::{
    AbsoluteObservation, ChassisSpeeds, LandmarkSighting, ModulePosition, NoiseVector,
    OdometryObservation, WheelSnapshot,
};
pub use crate::types::{LandmarkId, Timestamp};

// --- Estimation ---
pub use crate::config::EstimatorConfig;
pub use crate::error::{ConfigError, KinematicsError};
pub use crate::estimation::engine::FusionEngine;
pub use crate::estimation::fusion::{Correction, DropReason, PoseFusion};
pub use crate::estimation::gain::{GainStrategy, HeuristicGain, SteadyStateGain};
pub use crate::estimation::history::PoseHistory;
pub use crate::landmarks::LandmarkRegistry;

// --- Models ---
pub use crate::models::kinematics::ModuleKinematics;
pub use crate::models::vision_noise::VisionNoiseModel;
