//! Bounded per-sensor anomaly history
//!
//! Keeps, per sensor, the last M anomaly records and the last M evaluated
//! verdicts (for the anomaly ratio). M is resolved per sensor by the caller
//! and passed with every write; a log whose M changes keeps its newest
//! entries. Each sensor's logs sit behind their own `RwLock`: status queries
//! for a sensor share the read lock, and a write swaps in evict+append under
//! the write lock so a reader never sees one without the other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::buffer::CircularBuffer;
use crate::events::{AnomalyRecord, SensorId};
use crate::sync;

#[derive(Debug)]
struct SensorLog {
    anomalies: CircularBuffer<AnomalyRecord>,
    verdicts: CircularBuffer<bool>,
    flagged: usize,
}

impl SensorLog {
    fn new(capacity: usize) -> Self {
        Self {
            anomalies: CircularBuffer::new(capacity),
            verdicts: CircularBuffer::new(capacity),
            flagged: 0,
        }
    }

    fn resize(&mut self, capacity: usize) {
        if capacity.max(1) == self.anomalies.capacity() {
            return;
        }

        let mut anomalies = CircularBuffer::new(capacity);
        let mut verdicts = CircularBuffer::new(capacity);
        for record in self.anomalies.iter() {
            anomalies.push(record.clone());
        }
        for verdict in self.verdicts.iter() {
            verdicts.push(*verdict);
        }

        self.flagged = verdicts.iter().filter(|flagged| **flagged).count();
        self.anomalies = anomalies;
        self.verdicts = verdicts;
    }
}

/// Most-recent-first anomaly log with a per-sensor capacity
#[derive(Debug, Default)]
pub struct AnomalyHistory {
    logs: RwLock<HashMap<SensorId, Arc<RwLock<SensorLog>>>>,
}

impl AnomalyHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an anomaly to a log of `capacity` entries, evicting the oldest
    pub fn record(&self, sensor_id: &str, capacity: usize, record: AnomalyRecord) {
        let log = self.log(sensor_id, capacity);
        let mut log = sync::write(&log);
        log.resize(capacity);
        log.anomalies.push(record);
    }

    /// Note whether an evaluated reading was anomalous
    pub fn observe(&self, sensor_id: &str, capacity: usize, is_anomaly: bool) {
        let log = self.log(sensor_id, capacity);
        let mut log = sync::write(&log);
        log.resize(capacity);

        if log.verdicts.push(is_anomaly) == Some(true) {
            log.flagged -= 1;
        }
        if is_anomaly {
            log.flagged += 1;
        }
    }

    /// Anomalies for a sensor, most recent first
    pub fn recent(&self, sensor_id: &str) -> Vec<AnomalyRecord> {
        let Some(log) = self.existing(sensor_id) else {
            return Vec::new();
        };
        let log = sync::read(&log);
        log.anomalies.iter().rev().cloned().collect()
    }

    /// Fraction of the last evaluated readings that were anomalous
    pub fn anomaly_ratio(&self, sensor_id: &str) -> f64 {
        let Some(log) = self.existing(sensor_id) else {
            return 0.0;
        };
        let log = sync::read(&log);
        if log.verdicts.is_empty() {
            return 0.0;
        }
        log.flagged as f64 / log.verdicts.len() as f64
    }

    /// Forget everything about a sensor
    pub fn clear(&self, sensor_id: &str) -> bool {
        sync::write(&self.logs).remove(sensor_id).is_some()
    }

    fn existing(&self, sensor_id: &str) -> Option<Arc<RwLock<SensorLog>>> {
        sync::read(&self.logs).get(sensor_id).cloned()
    }

    fn log(&self, sensor_id: &str, capacity: usize) -> Arc<RwLock<SensorLog>> {
        if let Some(log) = self.existing(sensor_id) {
            return log;
        }

        let mut logs = sync::write(&self.logs);
        let log = logs
            .entry(sensor_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(SensorLog::new(capacity))));
        Arc::clone(log)
    }
}
