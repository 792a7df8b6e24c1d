//! Durability readings and the time-ordered log that holds them.

use serde::{Deserialize, Serialize};

/// One timestamped observation of the tracked durability.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Remaining durability, never negative
    pub value: i64,
}

impl Reading {
    pub fn new(timestamp_ms: i64, value: i64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// Append-only collection of readings, kept sorted ascending by timestamp.
///
/// Readings are entered by hand, so insertion order is not assumed to be
/// chronological. Readings with equal timestamps keep their insertion order.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReadingLog {
    readings: Vec<Reading>,
}

impl ReadingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from readings in any order.
    pub fn from_unsorted(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp_ms);
        Self { readings }
    }

    /// Insert a reading at its chronological position.
    pub fn insert(&mut self, reading: Reading) {
        let at = self
            .readings
            .partition_point(|r| r.timestamp_ms <= reading.timestamp_ms);
        self.readings.insert(at, reading);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Reading] {
        &self.readings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    /// Most recent reading by timestamp.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// The `n` most recent readings, oldest first.
    pub fn recent(&self, n: usize) -> &[Reading] {
        let start = self.readings.len().saturating_sub(n);
        &self.readings[start..]
    }

    pub fn is_sorted(&self) -> bool {
        self.readings
            .windows(2)
            .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms)
    }
}

impl<'a> IntoIterator for &'a ReadingLog {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_chronological_order() {
        let mut log = ReadingLog::new();
        log.insert(Reading::new(3_000, 70));
        log.insert(Reading::new(1_000, 90));
        log.insert(Reading::new(2_000, 80));
        log.insert(Reading::new(500, 100));

        let times: Vec<i64> = log.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(times, vec![500, 1_000, 2_000, 3_000]);
        assert!(log.is_sorted());
        assert_eq!(log.latest().map(|r| r.value), Some(70));
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let mut log = ReadingLog::new();
        log.insert(Reading::new(1_000, 90));
        log.insert(Reading::new(1_000, 85));

        assert_eq!(log.as_slice()[0].value, 90);
        assert_eq!(log.as_slice()[1].value, 85);
    }

    #[test]
    fn test_recent_window() {
        let log = ReadingLog::from_unsorted((0..10).rev().map(|i| Reading::new(i, i)).collect());
        assert!(log.is_sorted());

        let tail = log.recent(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].timestamp_ms, 7);
        assert_eq!(tail[2].timestamp_ms, 9);

        assert_eq!(log.recent(50).len(), 10);
    }
}
