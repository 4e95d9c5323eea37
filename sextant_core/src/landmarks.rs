// sextant_core/src/landmarks.rs

//! Bookkeeping of which field landmarks the vision collaborator has seen.
//!
//! The registry is written by the vision side and read by telemetry; it never
//! feeds back into the pose estimate.

use std::collections::{BTreeSet, HashMap};

use crate::messages::LandmarkSighting;
use crate::types::{LandmarkId, Timestamp};

#[derive(Debug, Clone, Default)]
pub struct LandmarkRegistry {
    latest: HashMap<LandmarkId, LandmarkSighting>,
    seen: BTreeSet<LandmarkId>,
}

impl LandmarkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `sighting` unless a newer sighting of the same landmark is already held.
    pub fn record(&mut self, sighting: LandmarkSighting) {
        self.seen.insert(sighting.id);
        match self.latest.get(&sighting.id) {
            Some(existing) if existing.timestamp > sighting.timestamp => {}
            _ => {
                self.latest.insert(sighting.id, sighting);
            }
        }
    }

    pub fn latest(&self, id: LandmarkId) -> Option<&LandmarkSighting> {
        self.latest.get(&id)
    }

    /// Ids sighted within `stale_secs` of `now`, in ascending order.
    pub fn visible_at(&self, now: Timestamp, stale_secs: f64) -> Vec<LandmarkId> {
        let mut ids: Vec<LandmarkId> = self
            .latest
            .values()
            .filter(|s| now - s.timestamp < stale_secs)
            .map(|s| s.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Every id seen since the last `clear`, in ascending order.
    pub fn all_seen(&self) -> Vec<LandmarkId> {
        self.seen.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.latest.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pose2;

    fn sighting(id: LandmarkId, timestamp: Timestamp) -> LandmarkSighting {
        LandmarkSighting {
            id,
            pose: Pose2::new(id as f64, 0.0, 0.0),
            distance: 2.0,
            timestamp,
        }
    }

    #[test]
    fn visibility_expires() {
        let mut registry = LandmarkRegistry::new();
        registry.record(sighting(7, 1.0));
        registry.record(sighting(3, 1.4));
        assert_eq!(registry.visible_at(1.45, 0.5), vec![3, 7]);
        assert_eq!(registry.visible_at(1.7, 0.5), vec![3]);
        assert_eq!(registry.all_seen(), vec![3, 7]);
    }

    #[test]
    fn older_sighting_does_not_replace_newer() {
        let mut registry = LandmarkRegistry::new();
        registry.record(sighting(5, 2.0));
        registry.record(sighting(5, 1.0));
        assert_eq!(registry.latest(5).map(|s| s.timestamp), Some(2.0));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut registry = LandmarkRegistry::new();
        registry.record(sighting(1, 0.0));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.latest(1).is_none());
    }
}
