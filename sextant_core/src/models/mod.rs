// sextant_core/src/models/mod.rs

pub mod kinematics;
pub mod vision_noise;
