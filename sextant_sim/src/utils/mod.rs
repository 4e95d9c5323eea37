// sextant_sim/src/utils/mod.rs

pub mod serde_helpers;
