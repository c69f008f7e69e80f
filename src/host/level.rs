//! Level data and the detected-count counter drain.
//!
//! The map-scanning collaborator (not part of this crate) increments the
//! [`DetectedCounter`] while it walks level data; this core drains it - read and
//! reset as one logical unit - exactly once per load event and folds the value
//! into the level's declared total.

use std::sync::atomic::{AtomicU32, Ordering};

/// Declared map properties handed to a load event.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDef {
    /// Map name.
    pub name: String,
    /// Collectible total the map data declares on its own.
    pub declared_total: u32,
}

/// The loaded level's mutable mode data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapData {
    /// Name of the loaded map.
    pub name: String,
    /// Total collectible count, including drained detections.
    pub total_collectibles: u32,
}

/// Counter of extra collectibles detected by the external map scanner.
///
/// Increment is owned by the scanner; drain is owned by this core. The counter is
/// scoped to one host world (one world per logical process), so repeated or
/// nested load events cannot double-count.
#[derive(Default)]
pub struct DetectedCounter(AtomicU32);

impl DetectedCounter {
    /// Records `count` additional detected collectibles. Scanner-side interface.
    pub fn record(&self, count: u32) {
        self.0.fetch_add(count, Ordering::Relaxed);
    }

    /// Reads the counter and resets it to zero as one atomic unit.
    pub fn drain(&self) -> u32 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// Level state: the loaded map data plus the detection counter.
#[derive(Default)]
pub struct Level {
    /// Mutable data of the currently loaded map.
    pub map: MapData,
    /// Detections accumulated by the external map scanner.
    pub detected: DetectedCounter,
}

impl Level {
    /// The host's own load logic: adopt the declared map properties.
    pub fn load(&mut self, def: &MapDef) {
        self.map.name = def.name.clone();
        self.map.total_collectibles = def.declared_total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_zero_is_a_noop() {
        let counter = DetectedCounter::default();
        assert_eq!(counter.drain(), 0);
        assert_eq!(counter.drain(), 0);
    }

    #[test]
    fn test_drain_returns_and_resets() {
        let counter = DetectedCounter::default();
        counter.record(3);
        assert_eq!(counter.drain(), 3);
        assert_eq!(counter.drain(), 0);
    }

    #[test]
    fn test_record_accumulates() {
        let counter = DetectedCounter::default();
        counter.record(1);
        counter.record(2);
        assert_eq!(counter.drain(), 3);
    }
}
