// Series store - bounded, ordered, deduplicated history for one device
use super::reading::Reading;
use std::collections::VecDeque;

/// Ordered readings with strictly increasing timestamps, at most `capacity` long.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl SeriesStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Discard current content and keep the most recent `capacity` readings.
    pub fn replace(&mut self, mut readings: Vec<Reading>) {
        readings.sort_by_key(|r| r.timestamp);
        readings.dedup_by_key(|r| r.timestamp);

        let excess = readings.len().saturating_sub(self.capacity);
        self.readings = readings.into_iter().skip(excess).collect();
    }

    /// Append a reading newer than everything stored. Returns whether it was inserted.
    pub fn merge(&mut self, reading: Reading) -> bool {
        if let Some(max) = self.max_timestamp() {
            if reading.timestamp <= max {
                return false;
            }
        }

        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
        true
    }

    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    /// Readings with `left <= timestamp <= right`.
    pub fn between(&self, left: i64, right: i64) -> Vec<Reading> {
        let start = self.readings.partition_point(|r| r.timestamp < left);
        let end = self.readings.partition_point(|r| r.timestamp <= right);
        if start >= end {
            return Vec::new();
        }
        self.readings.range(start..end).cloned().collect()
    }

    pub fn max_timestamp(&self) -> Option<i64> {
        self.readings.back().map(|r| r.timestamp)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
