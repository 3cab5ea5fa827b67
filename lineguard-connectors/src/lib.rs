//! Storage Connectors for LineGuard
//!
//! ## Overview
//!
//! Every reading the engine accepts becomes an
//! [`AnnotatedPoint`](lineguard_core::AnnotatedPoint) that has to reach the
//! time-series database behind the dashboards. This crate provides:
//!
//! - [`line_protocol`]: encoding of annotated points as InfluxDB line
//!   protocol, one line per point
//! - [`influx::InfluxSink`] (feature `influx`, on by default): a
//!   [`StorageSink`](lineguard_core::StorageSink) that posts line protocol
//!   to the InfluxDB v2 write API
//!
//! ## Measurements
//!
//! | Sensor type | Measurement | Value fields |
//! |---|---|---|
//! | generic | `SingleSensorAnalytics` | `value` |
//! | vibration | `VibSensor` | `vib_accel_rms_x/y/z`, `vib_accel_rms_total` |
//!
//! Both carry the tags `line_name`, `machine_name`, `sensor_name` and the
//! analytics fields `anomaly`, `anomaly_ratio`, `model_avg`, `z_score`,
//! `z_score_thresh`.
//!
//! ## Retry Logic
//!
//! Exponential backoff, synchronous:
//! ```text
//! retry_delay = base * 2^(attempt - 1)
//! ```
//! Server errors (5xx), rate limiting (429) and transport failures are
//! retried. Other 4xx responses mean the point itself is bad and are not.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lineguard_connectors::influx::{InfluxConfig, InfluxSink};
//! use lineguard_core::{EngineConfig, InMemoryCatalog, IngestionPipeline, SensorProfile, SensorReading};
//!
//! let sink = InfluxSink::new(
//!     InfluxConfig::new("http://influxdb:8086", "my-org", "line_data")
//!         .token("secret-token")
//!         .max_retries(3),
//! )?;
//!
//! let catalog = InMemoryCatalog::new();
//! catalog.register("press_01", SensorProfile::generic());
//! let pipeline = IngestionPipeline::new(catalog, EngineConfig::default());
//!
//! pipeline.ingest_and_store(SensorReading::new("press_01", 1_700_000_000_000, 4.2), &sink)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "influx")]
pub mod influx;

pub mod line_protocol;

#[cfg(feature = "influx")]
pub use influx::{InfluxConfig, InfluxError, InfluxSink};

/// Write statistics kept by connectors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Points written successfully
    pub points_sent: u64,
    /// Points that could not be written
    pub points_failed: u64,
    /// Request body bytes accepted by the server
    pub bytes_sent: u64,
    /// Retried requests
    pub retries: u64,
    /// Last error message
    pub last_error: Option<String>,
}
