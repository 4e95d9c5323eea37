// sextant_sim/src/lib.rs

// Simulated drivetrain and camera collaborators that exercise `sextant_core`
// in a closed control loop.
pub mod cli;
pub mod config;
pub mod drivetrain;
pub mod logging;
pub mod prng;
pub mod runner;
pub mod utils;
pub mod vision;
