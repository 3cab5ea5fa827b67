//! Ingestion Pipeline
//!
//! ## Overview
//!
//! The pipeline is the only component with side effects. For every reading:
//!
//! ```text
//! validate ──► catalog lookup ──► resolve params
//!                                      │
//!               ┌──────── sensor partition lock ────────┐
//!               │ window update ◄──► z-score evaluation │
//!               │ ratio log (evaluated readings only)   │
//!               │ anomaly history (anomalies only)      │
//!               └───────────────────────────────────────┘
//!                                      │
//!                               AnnotatedPoint
//! ```
//!
//! Rejections happen before any state is touched: an invalid reading, an
//! unknown sensor, or a sensor whose resolved parameters are unusable leaves
//! every window and history exactly as it was.
//!
//! ## Concurrency
//!
//! `ingest` takes `&self` and the pipeline is `Sync`, so it can be shared
//! across threads behind an `Arc`. The sensor's window mutex is held from
//! the window update through the history append: two readings of the same
//! sensor are fully serialized, readings of different sensors never wait
//! on each other. [`IngestionPipeline::reset_sensor`] takes the same mutex,
//! so a reset never lands between a reading's window update and its
//! history append.
//!
//! ## Usage
//!
//! ```rust
//! use lineguard_core::{
//!     EngineConfig, InMemoryCatalog, IngestionPipeline, SensorProfile, SensorReading,
//! };
//!
//! let catalog = InMemoryCatalog::new();
//! catalog.register("press_01", SensorProfile::generic());
//!
//! let pipeline = IngestionPipeline::new(catalog, EngineConfig::default());
//! let point = pipeline.ingest(SensorReading::new("press_01", 1_700_000_000_000, 4.2))?;
//!
//! // Window still warming up
//! assert!(!point.is_anomaly);
//! assert_eq!(point.z_score, None);
//! # Ok::<(), lineguard_core::EngineError>(())
//! ```

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{DetectionParams, EngineConfig, EvaluationOrder};
use crate::detector::{Verdict, ZScoreDetector};
use crate::errors::{EngineError, EngineResult};
use crate::events::{AnnotatedPoint, AnomalyRecord, SensorId, SensorReading, SensorType};
use crate::history::AnomalyHistory;
use crate::sync;
use crate::traits::{SensorCatalog, StorageSink};
use crate::window::{SlidingWindowStore, WindowStats};

/// Snapshot of one sensor's detection state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatus {
    /// Sensor queried
    pub sensor_id: SensorId,
    /// Sensor class from the catalog
    pub sensor_type: SensorType,
    /// Parameters in effect
    pub params: DetectionParams,
    /// Anomaly records kept for this sensor
    pub history_capacity: usize,
    /// Window statistics; `None` until the first accepted reading
    pub window: Option<WindowStats>,
    /// Window fill level in percent
    pub model_completeness: u8,
    /// Fraction of recent evaluated readings that were anomalous
    pub anomaly_ratio: f64,
    /// Anomalies currently held in the history
    pub recent_anomaly_count: usize,
}

/// Sliding-window anomaly detection over a sensor catalog
#[derive(Debug)]
pub struct IngestionPipeline<C> {
    catalog: C,
    config: EngineConfig,
    windows: SlidingWindowStore,
    history: AnomalyHistory,
    detector: ZScoreDetector,
}

impl<C: SensorCatalog> IngestionPipeline<C> {
    /// Create a pipeline with empty state
    pub fn new(catalog: C, config: EngineConfig) -> Self {
        Self {
            catalog,
            config,
            windows: SlidingWindowStore::new(),
            history: AnomalyHistory::new(),
            detector: ZScoreDetector,
        }
    }

    /// Catalog the pipeline consults
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Configuration in effect
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of sensors with a live window
    pub fn tracked_sensors(&self) -> usize {
        self.windows.len()
    }

    /// Run one reading through detection
    ///
    /// Every accepted reading yields a point, anomalous or not. Readings
    /// rejected as invalid, from an unknown sensor, or under unusable
    /// parameters change no state.
    pub fn ingest(&self, reading: SensorReading) -> EngineResult<AnnotatedPoint> {
        let timestamp = match reading.validate() {
            Ok(timestamp) => timestamp,
            Err(reason) => {
                debug!("Rejected reading from {}: {}", reading.sensor_id, reason);
                return Err(EngineError::InvalidReading {
                    sensor: reading.sensor_id,
                    reason,
                });
            }
        };

        let Some(profile) = self.catalog.lookup(&reading.sensor_id) else {
            debug!("Rejected reading from unknown sensor {}", reading.sensor_id);
            return Err(EngineError::UnknownSensor(reading.sensor_id));
        };

        let (params, history_capacity) = match self.config.resolve(profile.sensor_type, &profile.overrides) {
            Ok(resolved) => resolved,
            Err(source) => {
                warn!("Refusing reading from {}: {}", reading.sensor_id, source);
                return Err(EngineError::InvalidParams {
                    sensor: reading.sensor_id,
                    source,
                });
            }
        };
        let min_samples = params.effective_min_samples();
        let value = reading.value;

        let partition = self.windows.partition(&reading.sensor_id, params.window_size);
        let mut window = sync::lock(&partition);
        window.resize(params.window_size);

        let (verdict, baseline) = match self.config.evaluation_order {
            EvaluationOrder::UpdateThenEvaluate => {
                let stats = window.push(value);
                (self.detector.evaluate(value, &stats, min_samples, params.threshold), stats)
            }
            EvaluationOrder::EvaluateThenUpdate => {
                let stats = window.stats();
                let verdict = self.detector.evaluate(value, &stats, min_samples, params.threshold);
                window.push(value);
                (verdict, stats)
            }
        };

        if verdict.is_evaluated() {
            self.history
                .observe(&reading.sensor_id, history_capacity, verdict.is_anomalous());
        }

        if let Verdict::Anomalous(z_score) = verdict {
            warn!(
                "Anomaly on {}: value {:.4}, z {:.4} (threshold {}, mean {:.4})",
                reading.sensor_id, value, z_score, params.threshold, baseline.mean
            );
            self.history.record(
                &reading.sensor_id,
                history_capacity,
                AnomalyRecord {
                    sensor_id: reading.sensor_id.clone(),
                    timestamp,
                    value,
                    z_score,
                    threshold: params.threshold,
                },
            );
        }

        let anomaly_ratio = self.history.anomaly_ratio(&reading.sensor_id);
        drop(window);

        Ok(AnnotatedPoint::new(
            reading,
            profile.sensor_type,
            verdict,
            baseline.mean,
            params.threshold,
            anomaly_ratio,
        ))
    }

    /// Ingest, then hand the point to `sink`
    ///
    /// A sink failure does not undo detection: the window and history keep
    /// the reading, and the point comes back inside the error.
    pub fn ingest_and_store<S>(&self, reading: SensorReading, sink: &S) -> EngineResult<AnnotatedPoint>
    where
        S: StorageSink + ?Sized,
    {
        let point = self.ingest(reading)?;

        match sink.write(&point) {
            Ok(()) => Ok(point),
            Err(source) => {
                warn!(
                    "{} sink failed for {}: {}",
                    sink.name(),
                    point.reading.sensor_id,
                    source
                );
                Err(EngineError::StorageFailure {
                    point: Box::new(point),
                    source,
                })
            }
        }
    }

    /// Anomalies for a sensor, most recent first
    pub fn recent_anomalies(&self, sensor_id: &str) -> Vec<AnomalyRecord> {
        self.history.recent(sensor_id)
    }

    /// Detection state of a catalogued sensor
    pub fn sensor_status(&self, sensor_id: &str) -> EngineResult<SensorStatus> {
        let profile = self
            .catalog
            .lookup(sensor_id)
            .ok_or_else(|| EngineError::UnknownSensor(sensor_id.to_string()))?;

        let window = self.windows.stats(sensor_id);

        Ok(SensorStatus {
            sensor_id: sensor_id.to_string(),
            sensor_type: profile.sensor_type,
            params: self.config.params_for(profile.sensor_type, &profile.overrides),
            history_capacity: self
                .config
                .history_capacity_for(profile.sensor_type, &profile.overrides),
            window,
            model_completeness: window.map_or(0, |stats| stats.completeness()),
            anomaly_ratio: self.history.anomaly_ratio(sensor_id),
            recent_anomaly_count: self.history.recent(sensor_id).len(),
        })
    }

    /// Empty a sensor's window and drop its history
    ///
    /// Holds the sensor's window lock throughout, so an in-flight reading
    /// lands either wholly before the reset or wholly after it. Returns
    /// whether any state existed.
    pub fn reset_sensor(&self, sensor_id: &str) -> bool {
        let partition = self.windows.get(sensor_id);
        let mut window = partition.as_deref().map(sync::lock);

        let had_window = window.as_mut().is_some_and(|window| {
            let had_values = !window.is_empty();
            window.clear();
            had_values
        });
        let had_history = self.history.clear(sensor_id);
        drop(window);

        let had_state = had_window || had_history;
        if had_state {
            info!("Reset detection state for {}", sensor_id);
        }
        had_state
    }
}
