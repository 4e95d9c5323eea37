// sextant_sim/src/vision.rs

use std::collections::VecDeque;

use nalgebra::{UnitComplex, Vector2};
use rand_distr::Normal;
use tracing::{debug, info};

use sextant_core::abstractions::AbsoluteMeasurementSource;
use sextant_core::geometry::{wrap_angle, Pose2};
use sextant_core::messages::{AbsoluteObservation, LandmarkSighting};
use sextant_core::models::vision_noise::VisionNoiseModel;
use sextant_core::types::{LandmarkId, Timestamp};

use crate::config::{SimError, VisionConfig};
use crate::prng::SimulationRng;

/// A frame whose pose solution is still in the processing pipeline.
#[derive(Debug, Clone)]
struct PendingFrame {
    ready_at: Timestamp,
    observation: AbsoluteObservation,
    sightings: Vec<LandmarkSighting>,
}

// =========================================================================
// == Simulated Camera ==
// =========================================================================

/// A landmark camera with a fixed processing latency.
///
/// `capture` looks at the landmarks from the true pose and queues a noisy
/// pose solution stamped with the capture time. `poll` releases the solutions
/// whose latency has elapsed.
#[derive(Debug)]
pub struct SimulatedCamera {
    landmarks: Vec<(LandmarkId, Vector2<f64>)>,
    max_range: f64,
    half_fov: f64,
    latency: f64,
    position_noise: Normal<f64>,
    heading_noise: Normal<f64>,
    noise_model: VisionNoiseModel,
    rng: SimulationRng,

    pending: VecDeque<PendingFrame>,
    released_sightings: Vec<LandmarkSighting>,
}

impl SimulatedCamera {
    pub fn new(config: &VisionConfig, rng: SimulationRng) -> Result<Self, SimError> {
        info!(
            "  -> Camera at {} Hz, {:.0} ms latency, {} landmarks",
            config.rate_hz,
            config.latency_secs * 1e3,
            config.landmarks.len()
        );
        Ok(Self {
            landmarks: config
                .landmarks
                .iter()
                .map(|l| (l.id, Vector2::new(l.position[0], l.position[1])))
                .collect(),
            max_range: config.max_range,
            half_fov: 0.5 * config.field_of_view,
            latency: config.latency_secs,
            position_noise: Normal::new(0.0, config.position_noise_std)?,
            heading_noise: Normal::new(0.0, config.heading_noise_std)?,
            noise_model: config.noise_model.clone(),
            rng,
            pending: VecDeque::new(),
            released_sightings: Vec::new(),
        })
    }

    /// Ids of the landmarks in range and inside the field of view from `pose`,
    /// with their distances.
    pub fn visible_from(&self, pose: &Pose2) -> Vec<(LandmarkId, f64)> {
        self.landmarks
            .iter()
            .filter_map(|(id, position)| {
                let offset = position - pose.translation();
                let distance = offset.norm();
                if distance > self.max_range {
                    return None;
                }
                let bearing = wrap_angle(offset.y.atan2(offset.x) - pose.heading());
                (bearing.abs() <= self.half_fov).then_some((*id, distance))
            })
            .collect()
    }

    /// Takes a frame at `timestamp` with the robot at `truth`.
    pub fn capture(&mut self, truth: &Pose2, timestamp: Timestamp) {
        let visible = self.visible_from(truth);
        if visible.is_empty() {
            return;
        }

        let sightings: Vec<LandmarkSighting> = visible
            .into_iter()
            .map(|(id, distance)| LandmarkSighting {
                id,
                pose: self.noisy(truth),
                distance,
                timestamp,
            })
            .collect();

        let count = sightings.len();
        let average_distance = sightings.iter().map(|s| s.distance).sum::<f64>() / count as f64;
        let observation = AbsoluteObservation {
            pose: combine(&sightings),
            timestamp,
            noise: self.noise_model.noise_for(count, average_distance),
        };
        debug!(
            t = timestamp,
            landmarks = count,
            average_distance,
            "Camera frame captured."
        );

        self.pending.push_back(PendingFrame {
            ready_at: timestamp + self.latency,
            observation,
            sightings,
        });
    }

    /// Frames captured but not yet released.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn noisy(&mut self, truth: &Pose2) -> Pose2 {
        let dx = self.rng.sample(&self.position_noise);
        let dy = self.rng.sample(&self.position_noise);
        let dtheta = self.rng.sample(&self.heading_noise);
        Pose2::new(truth.x() + dx, truth.y() + dy, truth.heading() + dtheta)
    }
}

/// Mean position and circular-mean heading of the per-landmark solutions.
fn combine(sightings: &[LandmarkSighting]) -> Pose2 {
    let n = sightings.len() as f64;
    let translation = sightings
        .iter()
        .fold(Vector2::zeros(), |sum, s| sum + s.pose.translation())
        / n;
    let (sin, cos) = sightings.iter().fold((0.0, 0.0), |(sin, cos), s| {
        let (ds, dc) = s.pose.heading().sin_cos();
        (sin + ds, cos + dc)
    });
    Pose2::from_parts(translation, UnitComplex::new(sin.atan2(cos)))
}

impl AbsoluteMeasurementSource for SimulatedCamera {
    fn poll(&mut self, timestamp: Timestamp) -> Vec<AbsoluteObservation> {
        self.released_sightings.clear();
        let mut released = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|frame| frame.ready_at <= timestamp)
        {
            if let Some(frame) = self.pending.pop_front() {
                self.released_sightings.extend(frame.sightings);
                released.push(frame.observation);
            }
        }
        released
    }

    fn sightings(&self) -> &[LandmarkSighting] {
        &self.released_sightings
    }
}
