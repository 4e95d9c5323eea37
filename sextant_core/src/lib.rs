// sextant_core/src/lib.rs

// Pose fusion for holonomic ground robots: wheel odometry plus delayed absolute fixes.
pub mod abstractions;
pub mod config;
pub mod error;
pub mod estimation;
pub mod geometry;
pub mod landmarks;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod types;
