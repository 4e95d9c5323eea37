// sextant_sim/src/drivetrain.rs

use nalgebra::Vector2;
use rand_distr::Normal;
use tracing::info;

use sextant_core::abstractions::OdometrySource;
use sextant_core::geometry::{wrap_angle, Pose2};
use sextant_core::messages::{ChassisSpeeds, ModulePosition, OdometryObservation, WheelSnapshot};
use sextant_core::models::kinematics::ModuleKinematics;
use sextant_core::types::Timestamp;

use crate::config::{CommandSegment, DrivetrainConfig, SimError};
use crate::prng::SimulationRng;

/// Below this a module is treated as stationary and keeps its last steering angle.
const MIN_MODULE_TRAVEL: f64 = 1e-12;

// =========================================================================
// == Simulated Drivetrain ==
// =========================================================================

/// A swerve drivetrain following a scripted command profile.
///
/// Ground truth moves exactly along the commanded arc. The reported wheel
/// travel is corrupted by random slip and a systematic scale error, and the
/// gyro (if fitted) reads the true heading change plus drift and white noise.
#[derive(Debug)]
pub struct SimulatedDrivetrain {
    kinematics: ModuleKinematics,
    segments: Vec<CommandSegment>,
    repeat: bool,
    slip_bias: f64,
    slip: Normal<f64>,
    gyro: Option<GyroModel>,
    rng: SimulationRng,

    truth: Pose2,
    start_heading: f64,
    modules: Vec<ModulePosition>,
    last_timestamp: Option<Timestamp>,
    measured_speeds: ChassisSpeeds,
}

#[derive(Debug)]
struct GyroModel {
    noise: Normal<f64>,
    drift_rate: f64,
}

impl SimulatedDrivetrain {
    pub fn new(
        config: &DrivetrainConfig,
        kinematics: ModuleKinematics,
        start_pose: Pose2,
        rng: SimulationRng,
    ) -> Result<Self, SimError> {
        let gyro = if config.gyro.enabled {
            Some(GyroModel {
                noise: Normal::new(0.0, config.gyro.noise_std)?,
                drift_rate: config.gyro.drift_rate,
            })
        } else {
            None
        };
        info!(
            "  -> Drivetrain with {} modules, {} command segments, gyro {}",
            kinematics.module_count(),
            config.segments.len(),
            if gyro.is_some() { "enabled" } else { "disabled" }
        );

        let module_count = kinematics.module_count();
        Ok(Self {
            kinematics,
            segments: config.segments.clone(),
            repeat: config.repeat,
            slip_bias: config.slip_bias,
            slip: Normal::new(0.0, config.slip_std_dev)?,
            gyro,
            rng,
            truth: start_pose,
            start_heading: start_pose.heading(),
            modules: vec![ModulePosition::new(0.0, Some(0.0)); module_count],
            last_timestamp: None,
            measured_speeds: ChassisSpeeds::default(),
        })
    }

    /// The true field pose at the last poll.
    pub fn truth(&self) -> Pose2 {
        self.truth
    }

    /// Body velocity as the wheel encoders saw it over the last poll interval.
    pub fn measured_speeds(&self) -> ChassisSpeeds {
        self.measured_speeds
    }

    /// The commanded speeds in effect at `elapsed` seconds into the run.
    pub fn command_at(&self, elapsed: f64) -> ChassisSpeeds {
        let total: f64 = self.segments.iter().map(|s| s.duration_secs).sum();
        if total <= 0.0 {
            return ChassisSpeeds::default();
        }
        let mut t = if self.repeat {
            elapsed.rem_euclid(total)
        } else {
            elapsed
        };
        for segment in &self.segments {
            if t < segment.duration_secs {
                return segment.speeds();
            }
            t -= segment.duration_secs;
        }
        ChassisSpeeds::default()
    }

    fn advance(&mut self, from: Timestamp, dt: f64) {
        let twist = self.command_at(from).to_twist(dt);
        self.truth = self.truth.exp(&twist);

        let displacements = self.kinematics.module_displacements(&twist);
        let mut measured: Vec<Vector2<f64>> = Vec::with_capacity(displacements.len());
        for (module, displacement) in self.modules.iter_mut().zip(&displacements) {
            let travel = displacement.norm();
            if travel > MIN_MODULE_TRAVEL {
                module.angle = Some(displacement.y.atan2(displacement.x));
            }
            let slip = 1.0 + self.slip_bias + self.rng.sample(&self.slip);
            let reported = travel * slip;
            module.distance += reported;
            measured.push(module.direction() * reported);
        }

        let velocities: Vec<Vector2<f64>> = measured.iter().map(|d| d.unscale(dt)).collect();
        self.measured_speeds = self.kinematics.to_chassis_speeds(&velocities);
    }

    fn gyro_reading(&mut self, timestamp: Timestamp) -> Option<f64> {
        let gyro = self.gyro.as_ref()?;
        let noise = self.rng.sample(&gyro.noise);
        let drift = gyro.drift_rate * timestamp;
        // The gyro reads zero at power-on, wherever the robot was facing.
        Some(wrap_angle(
            self.truth.heading() - self.start_heading + drift + noise,
        ))
    }
}

impl OdometrySource for SimulatedDrivetrain {
    fn poll(&mut self, timestamp: Timestamp) -> OdometryObservation {
        if let Some(last) = self.last_timestamp {
            let dt = timestamp - last;
            if dt > 0.0 {
                self.advance(last, dt);
            }
        }
        self.last_timestamp = Some(timestamp);

        OdometryObservation {
            wheels: WheelSnapshot::new(self.modules.clone()),
            gyro_heading: self.gyro_reading(timestamp),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GyroConfig;
    use approx::assert_abs_diff_eq;

    fn kinematics() -> ModuleKinematics {
        ModuleKinematics::from_arrays(&[[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]])
            .unwrap()
    }

    fn noiseless(segments: Vec<CommandSegment>, repeat: bool) -> DrivetrainConfig {
        DrivetrainConfig {
            segments,
            repeat,
            slip_std_dev: 0.0,
            slip_bias: 0.0,
            gyro: GyroConfig {
                enabled: true,
                noise_std: 0.0,
                drift_rate: 0.0,
            },
        }
    }

    fn segment(duration_secs: f64, vx: f64, vy: f64, omega: f64) -> CommandSegment {
        CommandSegment {
            duration_secs,
            vx,
            vy,
            omega,
        }
    }

    #[test]
    fn command_profile_plays_in_order() {
        let config = noiseless(
            vec![segment(1.0, 1.0, 0.0, 0.0), segment(2.0, 0.0, 0.5, 0.0)],
            false,
        );
        let drivetrain = SimulatedDrivetrain::new(
            &config,
            kinematics(),
            Pose2::identity(),
            SimulationRng::from_seed(1),
        )
        .unwrap();
        assert_eq!(drivetrain.command_at(0.5), ChassisSpeeds::new(1.0, 0.0, 0.0));
        assert_eq!(drivetrain.command_at(2.5), ChassisSpeeds::new(0.0, 0.5, 0.0));
        assert_eq!(drivetrain.command_at(3.5), ChassisSpeeds::default());
    }

    #[test]
    fn repeating_profile_wraps() {
        let config = noiseless(vec![segment(1.0, 1.0, 0.0, 0.0), segment(1.0, -1.0, 0.0, 0.0)], true);
        let drivetrain = SimulatedDrivetrain::new(
            &config,
            kinematics(),
            Pose2::identity(),
            SimulationRng::from_seed(1),
        )
        .unwrap();
        assert_eq!(drivetrain.command_at(2.5), ChassisSpeeds::new(1.0, 0.0, 0.0));
        assert_eq!(drivetrain.command_at(3.5), ChassisSpeeds::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn noiseless_wheels_reproduce_truth() {
        let config = noiseless(vec![segment(10.0, 0.8, 0.2, 0.3)], false);
        let start = Pose2::new(1.0, -1.0, 0.4);
        let kinematics = kinematics();
        let mut drivetrain = SimulatedDrivetrain::new(
            &config,
            kinematics.clone(),
            start,
            SimulationRng::from_seed(1),
        )
        .unwrap();

        let mut odometry = start;
        let mut last = drivetrain.poll(0.0);
        for k in 1..=100 {
            let next = drivetrain.poll(0.02 * k as f64);
            let twist = kinematics.twist_between(&last.wheels, &next.wheels);
            odometry = odometry.exp(&twist);
            last = next;
        }

        let truth = drivetrain.truth();
        assert_abs_diff_eq!(odometry.x(), truth.x(), epsilon = 1e-9);
        assert_abs_diff_eq!(odometry.y(), truth.y(), epsilon = 1e-9);
        assert_abs_diff_eq!(odometry.heading(), truth.heading(), epsilon = 1e-9);

        let speeds = drivetrain.measured_speeds();
        assert_abs_diff_eq!(speeds.vx, 0.8, epsilon = 1e-9);
        assert_abs_diff_eq!(speeds.vy, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(speeds.omega, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn gyro_reads_heading_change_since_start() {
        let config = noiseless(vec![segment(10.0, 0.0, 0.0, 0.5)], false);
        let mut drivetrain = SimulatedDrivetrain::new(
            &config,
            kinematics(),
            Pose2::new(0.0, 0.0, 1.0),
            SimulationRng::from_seed(1),
        )
        .unwrap();
        assert_eq!(drivetrain.poll(0.0).gyro_heading, Some(0.0));
        let reading = drivetrain.poll(1.0).gyro_heading.unwrap();
        assert_abs_diff_eq!(reading, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn wheel_scale_error_overreports_travel() {
        let mut config = noiseless(vec![segment(10.0, 1.0, 0.0, 0.0)], false);
        config.slip_bias = 0.1;
        let mut drivetrain = SimulatedDrivetrain::new(
            &config,
            kinematics(),
            Pose2::identity(),
            SimulationRng::from_seed(1),
        )
        .unwrap();
        drivetrain.poll(0.0);
        let observation = drivetrain.poll(1.0);
        for module in &observation.wheels.modules {
            assert_abs_diff_eq!(module.distance, 1.1, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(drivetrain.truth().x(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn same_seed_same_wheels() {
        let config = DrivetrainConfig::default();
        let run = |seed| {
            let mut drivetrain = SimulatedDrivetrain::new(
                &config,
                kinematics(),
                Pose2::identity(),
                SimulationRng::from_seed(seed),
            )
            .unwrap();
            (0..50)
                .map(|k| drivetrain.poll(0.02 * k as f64))
                .last()
                .unwrap()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }
}
