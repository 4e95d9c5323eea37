// sextant_sim/src/runner.rs

use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use sextant_core::abstractions::{AbsoluteMeasurementSource, OdometrySource};
use sextant_core::estimation::engine::FusionEngine;
use sextant_core::estimation::fusion::Correction;
use sextant_core::estimation::PoseEstimator;
use sextant_core::geometry::{wrap_angle, Pose2};
use sextant_core::types::{LandmarkId, Timestamp};

use crate::config::{ScenarioConfig, SimError};
use crate::drivetrain::SimulatedDrivetrain;
use crate::prng::SimulationRng;
use crate::vision::SimulatedCamera;

/// What the control loop hands the vision thread each camera period.
#[derive(Debug, Clone, Copy)]
struct VisionFrame {
    timestamp: Timestamp,
    truth: Pose2,
}

#[derive(Debug, Default, Clone, Copy)]
struct VisionStats {
    applied: usize,
    dropped: usize,
}

/// Root-mean-square error accumulator for one pose stream.
#[derive(Debug, Default, Clone, Copy)]
struct ErrorTally {
    translation_sq: f64,
    heading_sq: f64,
    samples: usize,
}

impl ErrorTally {
    fn add(&mut self, estimate: &Pose2, truth: &Pose2) {
        let heading = wrap_angle(estimate.heading() - truth.heading());
        self.translation_sq += estimate.distance(truth).powi(2);
        self.heading_sq += heading * heading;
        self.samples += 1;
    }

    fn rms(&self) -> (f64, f64) {
        if self.samples == 0 {
            return (0.0, 0.0);
        }
        let n = self.samples as f64;
        ((self.translation_sq / n).sqrt(), (self.heading_sq / n).sqrt())
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cycles: usize,
    pub duration_secs: f64,
    pub corrections_applied: usize,
    pub corrections_dropped: usize,
    /// RMS error of the uncorrected odometry pose against ground truth.
    pub odometry_rms_translation: f64,
    pub odometry_rms_heading: f64,
    /// RMS error of the fused estimate against ground truth.
    pub fused_rms_translation: f64,
    pub fused_rms_heading: f64,
    pub final_truth: Pose2,
    pub final_odometry: Pose2,
    pub final_estimate: Pose2,
    pub landmarks_seen: Vec<LandmarkId>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pose = |p: &Pose2| format!("({:.3}, {:.3}, {:.1}°)", p.x(), p.y(), p.heading().to_degrees());
        writeln!(
            f,
            "{} cycles over {:.1} s, {} corrections applied, {} dropped",
            self.cycles, self.duration_secs, self.corrections_applied, self.corrections_dropped
        )?;
        writeln!(
            f,
            "  odometry RMS: {:.3} m, {:.2}°",
            self.odometry_rms_translation,
            self.odometry_rms_heading.to_degrees()
        )?;
        writeln!(
            f,
            "  fused    RMS: {:.3} m, {:.2}°",
            self.fused_rms_translation,
            self.fused_rms_heading.to_degrees()
        )?;
        writeln!(
            f,
            "  final truth {} odometry {} estimate {}",
            pose(&self.final_truth),
            pose(&self.final_odometry),
            pose(&self.final_estimate)
        )?;
        write!(f, "  landmarks seen: {:?}", self.landmarks_seen)
    }
}

// =========================================================================
// == Simulation ==
// =========================================================================

/// Drives a `FusionEngine` with simulated collaborators.
///
/// The control loop runs on the calling thread at the configured rate. The
/// camera lives on its own thread and shares the engine through an `Arc`, the
/// same way a vision coprocessor feeds a robot's estimator.
pub struct Simulation {
    config: ScenarioConfig,
    engine: Arc<FusionEngine>,
}

impl Simulation {
    pub fn new(config: ScenarioConfig) -> Result<Self, SimError> {
        config.validate()?;
        let engine = Arc::new(FusionEngine::new(&config.estimator)?);
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<FusionEngine> {
        &self.engine
    }

    pub fn run(&self) -> Result<RunSummary, SimError> {
        let config = &self.config;
        let mut rng = SimulationRng::from_seed(config.simulation.seed);
        let mut drivetrain = SimulatedDrivetrain::new(
            &config.drivetrain,
            config.estimator.kinematics()?,
            config.start_pose,
            rng.fork(),
        )?;
        let camera = SimulatedCamera::new(&config.vision, rng.fork())?;

        let dt = 1.0 / config.simulation.control_rate_hz;
        let cycles = (config.simulation.duration_secs / dt).round() as usize;
        let vision_period = 1.0 / config.vision.rate_hz;
        info!(
            seed = config.simulation.seed,
            cycles,
            "Starting simulation of {:.1} s.",
            config.simulation.duration_secs
        );

        self.engine.reset(config.start_pose);
        self.engine.clear_landmarks();

        // Rendezvous channel: the camera is never more than one frame behind the control loop.
        let (frames, frame_rx) = mpsc::sync_channel::<VisionFrame>(0);
        let vision = if config.vision.enabled {
            let engine = Arc::clone(&self.engine);
            Some(
                thread::Builder::new()
                    .name("vision".into())
                    .spawn(move || run_vision(camera, frame_rx, engine.as_ref()))?,
            )
        } else {
            None
        };

        let mut odometry_error = ErrorTally::default();
        let mut fused_error = ErrorTally::default();
        let mut next_frame = 0.0;
        let mut vision_alive = vision.is_some();

        for k in 0..=cycles {
            let t = k as f64 * dt;
            let observation = drivetrain.poll(t);
            self.engine.add_odometry_observation(&observation);
            self.engine.add_drive_speeds(drivetrain.measured_speeds());

            let truth = drivetrain.truth();
            let (odometry, estimate) = self.engine.poses();
            odometry_error.add(&odometry, &truth);
            fused_error.add(&estimate, &truth);

            if vision_alive && t + 1e-9 >= next_frame {
                next_frame += vision_period;
                if frames.send(VisionFrame { timestamp: t, truth }).is_err() {
                    warn!("Vision thread stopped early; continuing on odometry alone.");
                    vision_alive = false;
                }
            }
        }
        drop(frames);

        let stats = match vision {
            Some(handle) => handle.join().map_err(|_| SimError::VisionThreadPanicked)?,
            None => VisionStats::default(),
        };

        let (odometry_rms_translation, odometry_rms_heading) = odometry_error.rms();
        let (fused_rms_translation, fused_rms_heading) = fused_error.rms();
        let (final_odometry, final_estimate) = self.engine.poses();
        let summary = RunSummary {
            cycles,
            duration_secs: cycles as f64 * dt,
            corrections_applied: stats.applied,
            corrections_dropped: stats.dropped,
            odometry_rms_translation,
            odometry_rms_heading,
            fused_rms_translation,
            fused_rms_heading,
            final_truth: drivetrain.truth(),
            final_odometry,
            final_estimate,
            landmarks_seen: self.engine.landmarks().all_seen(),
        };
        info!("Simulation finished.");
        Ok(summary)
    }
}

/// Vision thread body: capture, wait out latency, hand fixes to the estimator.
fn run_vision(
    mut camera: SimulatedCamera,
    frames: Receiver<VisionFrame>,
    engine: &FusionEngine,
) -> VisionStats {
    let mut stats = VisionStats::default();
    for frame in frames {
        camera.capture(&frame.truth, frame.timestamp);
        for observation in camera.poll(frame.timestamp) {
            match PoseEstimator::add_absolute_observation(engine, &observation) {
                Correction::Applied { .. } => stats.applied += 1,
                Correction::Dropped(reason) => {
                    debug!(%reason, "Vision fix dropped.");
                    stats.dropped += 1;
                }
            }
        }
        engine.record_landmarks(camera.sightings());
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use sextant_core::geometry::Pose2;

    #[test]
    fn error_tally_is_rms() {
        let mut tally = ErrorTally::default();
        let truth = Pose2::identity();
        tally.add(&Pose2::new(3.0, 4.0, 0.0), &truth);
        tally.add(&Pose2::new(0.0, 0.0, 0.0), &truth);
        let (translation, heading) = tally.rms();
        approx::assert_abs_diff_eq!(translation, (25.0_f64 / 2.0).sqrt(), epsilon = 1e-12);
        assert_eq!(heading, 0.0);
    }

    #[test]
    fn empty_tally_is_zero() {
        assert_eq!(ErrorTally::default().rms(), (0.0, 0.0));
    }

    #[test]
    fn heading_error_wraps() {
        let mut tally = ErrorTally::default();
        tally.add(&Pose2::new(0.0, 0.0, 3.1), &Pose2::new(0.0, 0.0, -3.1));
        let (_, heading) = tally.rms();
        approx::assert_abs_diff_eq!(heading, 2.0 * std::f64::consts::PI - 6.2, epsilon = 1e-9);
    }
}
