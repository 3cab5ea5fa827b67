//! Per-sensor anomaly detection engine for LineGuard
//!
//! Turns a stream of industrial sensor readings into a running statistical
//! model per sensor, anomaly flags, and a bounded history of recent
//! anomalies.
//!
//! Key properties:
//! - O(1) sliding-window mean/variance per reading
//! - One lock per sensor; sensors never contend with each other
//! - Bad readings are rejected before they can touch any state
//!
//! ```
//! use lineguard_core::{
//!     EngineConfig, InMemoryCatalog, IngestionPipeline, SensorProfile, SensorReading,
//! };
//!
//! let catalog = InMemoryCatalog::new();
//! catalog.register("temp_01", SensorProfile::generic());
//! let pipeline = IngestionPipeline::new(catalog, EngineConfig::default());
//!
//! for (i, value) in [20.1, 20.3, 19.9].into_iter().enumerate() {
//!     let point = pipeline.ingest(SensorReading::new("temp_01", i as u64 * 1000, value)).unwrap();
//!     if point.is_anomaly {
//!         // alert
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod catalog;
pub mod config;
pub mod detector;
pub mod errors;
pub mod events;
pub mod history;
pub mod pipeline;
pub mod sink;
pub mod time;
pub mod traits;
pub mod window;

mod sync;

// Public API
pub use catalog::{InMemoryCatalog, SensorProfile};
pub use config::{DetectionParams, EngineConfig, EvaluationOrder, ParamOverrides};
pub use detector::{Verdict, ZScoreDetector, ZERO_VARIANCE_Z_SCORE};
pub use errors::{ConfigError, EngineError, EngineResult, InvalidReason, SinkError};
pub use events::{AnnotatedPoint, AnomalyRecord, SensorId, SensorReading, SensorType, VibrationAxes};
pub use history::AnomalyHistory;
pub use pipeline::{IngestionPipeline, SensorStatus};
pub use sink::{MemorySink, NullSink};
pub use time::Timestamp;
pub use traits::{SensorCatalog, StorageSink};
pub use window::{SensorWindow, SlidingWindowStore, WindowStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IngestionPipeline<InMemoryCatalog>>();
        assert_send_sync::<MemorySink>();
    }
}
