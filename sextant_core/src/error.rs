// sextant_core/src/error.rs

use thiserror::Error;

/// Problems with a module layout, caught when the kinematics model is built.
#[derive(Debug, Error)]
pub enum KinematicsError {
    #[error("kinematics needs at least one module")]
    NoModules,
    #[error("module translations must be finite")]
    NonFiniteTranslation,
    #[error("module layout cannot observe planar motion (rank {rank} < 3)")]
    RankDeficient { rank: usize },
    #[error("module layout normal matrix is not positive definite")]
    NotPositiveDefinite,
}

/// Rejected estimator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("retention window must be finite and positive, got {0}")]
    InvalidRetentionWindow(f64),
    #[error("odometry std devs must be finite and non-negative, got {0:?}")]
    InvalidOdometryStdDevs([f64; 3]),
    #[error("landmark stale time must be finite and positive, got {0}")]
    InvalidLandmarkStaleTime(f64),
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}
