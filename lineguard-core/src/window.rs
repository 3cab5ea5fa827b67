//! Sliding-Window Statistics per Sensor
//!
//! ## Overview
//!
//! Each sensor gets a [`SensorWindow`]: the newest N values plus a running
//! mean and M2 (sum of squared deviations from the mean), maintained with
//! Welford's algorithm so an update costs O(1) whatever N is.
//!
//! ## Sliding, Not Cumulative
//!
//! When the window is full, the value falling out must also leave the
//! statistics. A cumulative mean never forgets: after a regime change it
//! keeps averaging in the old regime and the detector slowly goes deaf.
//! The window therefore removes the evicted value's contribution before
//! adding the new one:
//!
//! ```text
//! remove x_old (n → n−1):
//!     mean' = (n·mean − x_old) / (n − 1)
//!     M2'   = M2 − (x_old − mean)(x_old − mean')
//!
//! add x_new (n−1 → n):
//!     δ     = x_new − mean'
//!     mean''= mean' + δ / n
//!     M2''  = M2' + δ (x_new − mean'')
//! ```
//!
//! Subtraction accumulates rounding error that addition alone does not, so
//! after every `capacity` evictions the window recomputes mean and M2
//! exactly from its buffer. That keeps the amortized cost O(1).
//!
//! ## Concurrency
//!
//! [`SlidingWindowStore`] keeps one `Mutex<SensorWindow>` per sensor behind
//! an `RwLock`ed map. The map's write lock is only taken the first time a
//! sensor reports; afterwards lookups share the read lock and two sensors
//! never contend. Two readings of the *same* sensor serialize on that
//! sensor's mutex, which is what keeps evict-then-insert atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::info;
use serde::{Deserialize, Serialize};

use crate::buffer::CircularBuffer;
use crate::events::SensorId;
use crate::sync;

/// Snapshot of a window's statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Values currently contributing to the statistics
    pub sample_count: usize,
    /// Window capacity
    pub capacity: usize,
    /// Mean of the window
    pub mean: f64,
    /// Sample standard deviation (n − 1); zero below two samples
    pub stddev: f64,
}

impl WindowStats {
    /// Window fill level in percent
    pub fn completeness(&self) -> u8 {
        if self.capacity == 0 {
            return 0;
        }
        (100 * self.sample_count.min(self.capacity) / self.capacity) as u8
    }

    /// True once the window holds `capacity` values
    pub fn is_complete(&self) -> bool {
        self.sample_count >= self.capacity
    }
}

/// Bounded value buffer with incrementally maintained mean and variance
#[derive(Debug, Clone)]
pub struct SensorWindow {
    values: CircularBuffer<f64>,
    count: usize,
    mean: f64,
    m2: f64,
    evictions_since_resync: usize,
}

impl SensorWindow {
    /// Create an empty window
    pub fn new(capacity: usize) -> Self {
        Self {
            values: CircularBuffer::new(capacity),
            count: 0,
            mean: 0.0,
            m2: 0.0,
            evictions_since_resync: 0,
        }
    }

    /// Insert a value, evicting the oldest when full, and return new stats
    pub fn push(&mut self, value: f64) -> WindowStats {
        match self.values.push(value) {
            Some(evicted) => {
                self.remove(evicted);
                self.add(value);

                self.evictions_since_resync += 1;
                if self.evictions_since_resync >= self.values.capacity() {
                    self.resync();
                }
            }
            None => self.add(value),
        }

        self.stats()
    }

    /// Current statistics
    pub fn stats(&self) -> WindowStats {
        let stddev = if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        };

        WindowStats {
            sample_count: self.count,
            capacity: self.values.capacity(),
            mean: self.mean,
            stddev,
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maximum number of stored values
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Stored values, oldest first
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Change capacity, keeping the newest values that still fit
    pub fn resize(&mut self, capacity: usize) {
        if capacity.max(1) == self.values.capacity() {
            return;
        }

        let keep = self.values.len().min(capacity.max(1));
        let skip = self.values.len() - keep;

        let mut values = CircularBuffer::new(capacity);
        for value in self.values.iter().skip(skip) {
            values.push(*value);
        }

        self.values = values;
        self.resync();
    }

    /// Forget every value, keeping the capacity
    pub fn clear(&mut self) {
        self.values.clear();
        self.resync();
    }

    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn remove(&mut self, value: f64) {
        if self.count <= 1 {
            self.count = 0;
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }

        let n = self.count as f64;
        let reduced_mean = (n * self.mean - value) / (n - 1.0);
        self.m2 -= (value - self.mean) * (value - reduced_mean);
        self.m2 = self.m2.max(0.0);
        self.mean = reduced_mean;
        self.count -= 1;
    }

    /// Recompute mean and M2 from the buffer
    fn resync(&mut self) {
        self.count = self.values.len();
        self.evictions_since_resync = 0;

        if self.count == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }

        let mean = self.values.iter().sum::<f64>() / self.count as f64;
        self.m2 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        self.mean = mean;
    }
}

/// Per-sensor windows, each behind its own lock
#[derive(Debug, Default)]
pub struct SlidingWindowStore {
    partitions: RwLock<HashMap<SensorId, Arc<Mutex<SensorWindow>>>>,
}

impl SlidingWindowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Window partition for a sensor, created empty on first use
    ///
    /// Callers that need several steps to happen atomically for one sensor
    /// hold the returned mutex across them.
    pub fn partition(&self, sensor_id: &str, capacity: usize) -> Arc<Mutex<SensorWindow>> {
        if let Some(partition) = sync::read(&self.partitions).get(sensor_id) {
            return Arc::clone(partition);
        }

        let mut partitions = sync::write(&self.partitions);
        let partition = partitions.entry(sensor_id.to_string()).or_insert_with(|| {
            info!("Creating window for {} (capacity {})", sensor_id, capacity);
            Arc::new(Mutex::new(SensorWindow::new(capacity)))
        });
        Arc::clone(partition)
    }

    /// Window partition for a sensor, if it has one
    pub fn get(&self, sensor_id: &str) -> Option<Arc<Mutex<SensorWindow>>> {
        sync::read(&self.partitions).get(sensor_id).cloned()
    }

    /// Push a value into a sensor's window
    ///
    /// A window whose capacity differs from `capacity` is resized first.
    pub fn update(&self, sensor_id: &str, capacity: usize, value: f64) -> WindowStats {
        let partition = self.partition(sensor_id, capacity);
        let mut window = sync::lock(&partition);
        window.resize(capacity);
        window.push(value)
    }

    /// Statistics of a sensor's window, if it exists
    pub fn stats(&self, sensor_id: &str) -> Option<WindowStats> {
        let partition = self.get(sensor_id)?;
        let window = sync::lock(&partition);
        Some(window.stats())
    }

    /// Empty a sensor's window in place; returns whether it held values
    ///
    /// The partition stays in the map, so a caller already holding it keeps
    /// writing to the window every later caller sees.
    pub fn reset(&self, sensor_id: &str) -> bool {
        let Some(partition) = self.get(sensor_id) else {
            return false;
        };
        let mut window = sync::lock(&partition);
        let had_values = !window.is_empty();
        window.clear();
        had_values
    }

    /// Check if a sensor has a window
    pub fn contains(&self, sensor_id: &str) -> bool {
        sync::read(&self.partitions).contains_key(sensor_id)
    }

    /// Number of sensors with a window
    pub fn len(&self) -> usize {
        sync::read(&self.partitions).len()
    }

    /// Check if no sensor has a window yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
