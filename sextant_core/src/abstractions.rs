// sextant_core/src/abstractions.rs

use crate::messages::{AbsoluteObservation, LandmarkSighting, OdometryObservation};
use crate::types::Timestamp;

// --- ODOMETRY SOURCE TRAIT ---
// Anything that can report cumulative wheel travel, e.g. a drivetrain driver or a simulator.
pub trait OdometrySource: Send {
    /// Samples the wheels (and gyro, if fitted) at `timestamp`.
    fn poll(&mut self, timestamp: Timestamp) -> OdometryObservation;
}

// --- ABSOLUTE MEASUREMENT SOURCE TRAIT ---
// Anything producing field-frame pose fixes, typically a landmark camera.
pub trait AbsoluteMeasurementSource: Send {
    /// Pose solutions whose results became available by `timestamp`.
    ///
    /// Each observation carries its own capture time, which is earlier than
    /// `timestamp` by the source's latency.
    fn poll(&mut self, timestamp: Timestamp) -> Vec<AbsoluteObservation>;

    /// Individual landmark sightings behind the most recent `poll`.
    fn sightings(&self) -> &[LandmarkSighting] {
        &[]
    }
}
