//! Per-trace auxiliary probe state.
//!
//! Scratch bookkeeping that only lives as long as one ingestion session:
//! the power-rail index to track mapping established by descriptor packets,
//! and the set of package names already inserted so repeated or partial
//! package-list packets never produce duplicate rows.

use std::collections::{HashMap, HashSet};

use crate::track::TrackId;

#[derive(Debug, Default)]
pub struct ProbesTracker {
    power_rail_tracks: HashMap<u32, TrackId>,
    inserted_packages: HashSet<String>,
}

impl ProbesTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track for a rail index, if a descriptor established one.
    pub fn power_rail_track(&self, index: u32) -> Option<TrackId> {
        self.power_rail_tracks.get(&index).copied()
    }

    /// Bind a rail index to a track. The first descriptor for an index wins.
    pub fn set_power_rail_track(&mut self, index: u32, track: TrackId) {
        self.power_rail_tracks.entry(index).or_insert(track);
    }

    pub fn should_insert_package(&self, name: &str) -> bool {
        !self.inserted_packages.contains(name)
    }

    pub fn inserted_package(&mut self, name: String) {
        self.inserted_packages.insert(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TraceStorage;
    use crate::trace::TrackRecord;

    #[test]
    fn test_unknown_rail_index() {
        let tracker = ProbesTracker::new();
        assert_eq!(tracker.power_rail_track(3), None);
    }

    #[test]
    fn test_first_descriptor_wins() {
        let mut storage = TraceStorage::new();
        let name = storage.intern("power.rail_uws");
        let a = storage.push_track(TrackRecord {
            name,
            ..Default::default()
        });
        let b = storage.push_track(TrackRecord {
            name,
            ..Default::default()
        });
        let mut tracker = ProbesTracker::new();
        tracker.set_power_rail_track(3, a);
        tracker.set_power_rail_track(3, b);
        assert_eq!(tracker.power_rail_track(3), Some(a));
    }

    #[test]
    fn test_package_dedup() {
        let mut tracker = ProbesTracker::new();
        assert!(tracker.should_insert_package("com.example.app"));
        tracker.inserted_package("com.example.app".to_string());
        assert!(!tracker.should_insert_package("com.example.app"));
        assert!(tracker.should_insert_package("com.example.other"));
    }
}
