//! Common test utilities and data generators for integration tests
//!
//! - Deterministic sensor series (seeded noise, spikes, constants)
//! - Catalog and pipeline fixtures
//! - Brute-force window statistics for cross-checking

#![allow(dead_code)]

use lineguard_core::{
    time::{FixedTime, TimeSource},
    DetectionParams, EngineConfig, EvaluationOrder, InMemoryCatalog, IngestionPipeline, SensorProfile,
    SensorReading, SensorType, Timestamp, VibrationAxes,
};

/// Deterministic reading generator
pub struct SeriesGenerator {
    clock: FixedTime,
    interval_ms: u64,
    seed: u32,
}

impl SeriesGenerator {
    /// Start at `start` with one reading every `interval_ms`
    pub fn new(start: Timestamp, interval_ms: u64) -> Self {
        Self {
            clock: FixedTime::new(start),
            interval_ms,
            seed: 42,
        }
    }

    /// Next timestamp
    pub fn tick(&mut self) -> Timestamp {
        let now = self.clock.now();
        self.clock.advance(self.interval_ms);
        now
    }

    /// `count` readings around `base` with uniform noise of `±amplitude`
    pub fn noisy(&mut self, sensor_id: &str, base: f64, amplitude: f64, count: usize) -> Vec<SensorReading> {
        (0..count)
            .map(|_| {
                let value = base + self.noise(amplitude);
                SensorReading::new(sensor_id, self.tick(), value)
            })
            .collect()
    }

    /// `count` identical readings
    pub fn constant(&mut self, sensor_id: &str, value: f64, count: usize) -> Vec<SensorReading> {
        (0..count)
            .map(|_| SensorReading::new(sensor_id, self.tick(), value))
            .collect()
    }

    /// One reading
    pub fn single(&mut self, sensor_id: &str, value: f64) -> SensorReading {
        SensorReading::new(sensor_id, self.tick(), value)
    }

    /// Vibration readings with roughly steady axes
    pub fn vibration(&mut self, sensor_id: &str, base: VibrationAxes, count: usize) -> Vec<SensorReading> {
        (0..count)
            .map(|_| {
                let axes = VibrationAxes {
                    x: base.x + self.noise(0.05),
                    y: base.y + self.noise(0.05),
                    z: base.z + self.noise(0.05),
                };
                SensorReading::vibration(sensor_id, self.tick(), axes)
            })
            .collect()
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        let uniform = self.seed as f64 / u32::MAX as f64;
        (uniform - 0.5) * 2.0 * amplitude
    }
}

/// Catalog holding the given sensors with no overrides
pub fn catalog_with(sensors: &[(&str, SensorType)]) -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    for &(id, sensor_type) in sensors {
        catalog.register(id, SensorProfile::new(sensor_type));
    }
    catalog
}

/// Config with the same parameters for every sensor
pub fn config(window_size: usize, min_samples: usize, threshold: f64, order: EvaluationOrder) -> EngineConfig {
    EngineConfig {
        defaults: DetectionParams {
            window_size,
            min_samples,
            threshold,
        },
        evaluation_order: order,
        ..Default::default()
    }
}

/// Pipeline over generic sensors
pub fn generic_pipeline(sensors: &[&str], config: EngineConfig) -> IngestionPipeline<InMemoryCatalog> {
    let entries: Vec<(&str, SensorType)> = sensors.iter().map(|id| (*id, SensorType::Generic)).collect();
    IngestionPipeline::new(catalog_with(&entries), config)
}

/// Mean and sample stddev computed directly
pub fn brute_force_stats(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}
