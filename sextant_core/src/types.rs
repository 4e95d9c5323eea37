// sextant_core/src/types.rs

// --- Core Type Aliases ---

/// Seconds on the control loop's monotonic clock.
pub type Timestamp = f64;

/// Identifier of a field landmark (e.g. a fiducial tag number).
pub type LandmarkId = u32;
