// sextant_core/src/estimation/history.rs

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

use crate::geometry::Pose2;
use crate::types::Timestamp;

/// Timestamps are stored at microsecond granularity.
const TICKS_PER_SECOND: f64 = 1e6;

fn to_ticks(timestamp: Timestamp) -> i64 {
    (timestamp * TICKS_PER_SECOND).round() as i64
}

fn to_seconds(ticks: i64) -> Timestamp {
    ticks as f64 / TICKS_PER_SECOND
}

/// A bounded, time-ordered record of odometry poses.
///
/// Entries older than `window` relative to the newest entry are evicted after
/// every insert. Lookups between two entries interpolate; lookups past the
/// newest entry return it unchanged (no extrapolation).
#[derive(Debug, Clone)]
pub struct PoseHistory {
    window: f64,
    samples: BTreeMap<i64, Pose2>,
}

impl PoseHistory {
    /// `window` is the retention duration in seconds.
    pub fn new(window: f64) -> Self {
        Self {
            window,
            samples: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn newest_timestamp(&self) -> Option<Timestamp> {
        self.samples.keys().next_back().copied().map(to_seconds)
    }

    pub fn oldest_timestamp(&self) -> Option<Timestamp> {
        self.samples.keys().next().copied().map(to_seconds)
    }

    pub fn newest(&self) -> Option<(Timestamp, Pose2)> {
        self.samples
            .iter()
            .next_back()
            .map(|(k, pose)| (to_seconds(*k), *pose))
    }

    /// True if `timestamp` falls before the retention window measured from the newest entry.
    pub fn is_stale(&self, timestamp: Timestamp) -> bool {
        match self.newest_timestamp() {
            Some(newest) => newest - self.window > timestamp,
            None => false,
        }
    }

    /// Records `pose` at `timestamp`.
    ///
    /// A sample at an already-stored timestamp replaces it. A sample that is
    /// already outside the window is dropped without touching newer entries.
    pub fn insert(&mut self, timestamp: Timestamp, pose: Pose2) {
        if !timestamp.is_finite() || self.is_stale(timestamp) {
            return;
        }
        self.samples.insert(to_ticks(timestamp), pose);
        self.evict();
    }

    fn evict(&mut self) {
        let Some(newest) = self.samples.keys().next_back().copied() else {
            return;
        };
        let cutoff = newest - to_ticks(self.window);
        // Everything strictly older than the cutoff goes; the split keeps keys >= cutoff.
        self.samples = self.samples.split_off(&cutoff);
    }

    /// The pose at `timestamp`, interpolated between the bracketing entries.
    ///
    /// Returns `None` for an empty history or a timestamp older than the oldest entry.
    pub fn sample(&self, timestamp: Timestamp) -> Option<Pose2> {
        if !timestamp.is_finite() {
            return None;
        }
        let key = to_ticks(timestamp);

        let (&oldest, _) = self.samples.iter().next()?;
        if key < oldest {
            return None;
        }

        let (&lower_key, lower) = self.samples.range((Unbounded, Included(key))).next_back()?;
        if lower_key == key {
            return Some(*lower);
        }

        match self.samples.range((Excluded(key), Unbounded)).next() {
            Some((&upper_key, upper)) => {
                let t = (key - lower_key) as f64 / (upper_key - lower_key) as f64;
                Some(lower.interpolate(upper, t))
            }
            // Newer than everything we hold.
            None => Some(*lower),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn filled(window: f64) -> PoseHistory {
        let mut history = PoseHistory::new(window);
        for i in 0..=10 {
            let t = i as f64 * 0.1;
            history.insert(t, Pose2::new(t, 0.0, 0.0));
        }
        history
    }

    #[test]
    fn exact_match_returns_stored_pose() {
        let history = filled(2.0);
        let pose = history.sample(0.3).unwrap();
        assert_abs_diff_eq!(pose.x(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn lookup_between_entries_interpolates() {
        let mut history = PoseHistory::new(2.0);
        history.insert(1.0, Pose2::new(0.0, 0.0, 0.0));
        history.insert(2.0, Pose2::new(2.0, 4.0, 1.0));
        let pose = history.sample(1.25).unwrap();
        assert_abs_diff_eq!(pose.x(), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.heading(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn lookup_newer_than_newest_does_not_extrapolate() {
        let history = filled(2.0);
        let pose = history.sample(5.0).unwrap();
        assert_abs_diff_eq!(pose.x(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn lookup_older_than_oldest_is_not_found() {
        let history = filled(2.0);
        assert!(history.sample(-0.01).is_none());
        assert!(PoseHistory::new(2.0).sample(0.0).is_none());
    }

    #[test]
    fn entries_outside_window_are_evicted() {
        let history = filled(0.5);
        // Newest is 1.0, so 0.5 is the oldest retained entry.
        assert_abs_diff_eq!(history.oldest_timestamp().unwrap(), 0.5, epsilon = 1e-9);
        assert!(history.sample(0.4).is_none());
        assert!(history.sample(0.5).is_some());
    }

    #[test]
    fn stale_insert_does_not_disturb_newer_entries() {
        let mut history = filled(0.5);
        let before = history.len();
        history.insert(0.1, Pose2::new(99.0, 0.0, 0.0));
        assert_eq!(history.len(), before);
        assert_abs_diff_eq!(history.sample(1.0).unwrap().x(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn out_of_order_insert_inside_window_is_kept() {
        let mut history = PoseHistory::new(2.0);
        history.insert(1.0, Pose2::new(1.0, 0.0, 0.0));
        history.insert(0.5, Pose2::new(0.5, 0.0, 0.0));
        assert_eq!(history.len(), 2);
        assert_abs_diff_eq!(history.newest_timestamp().unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(history.sample(0.75).unwrap().x(), 0.75, epsilon = 1e-9);
    }

    #[test]
    fn insert_is_idempotent_at_stored_granularity() {
        let mut history = PoseHistory::new(2.0);
        history.insert(1.0, Pose2::new(1.0, 0.0, 0.0));
        history.insert(1.0 + 1e-8, Pose2::new(1.0, 0.0, 0.0));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut history = filled(2.0);
        history.clear();
        assert!(history.is_empty());
        assert!(history.newest().is_none());
        assert!(!history.is_stale(-100.0));
    }
}
