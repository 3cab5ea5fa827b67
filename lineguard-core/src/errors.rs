//! Error Types for the Detection Engine
//!
//! ## Error Categories
//!
//! Every reading handed to the engine either produces an annotated point or
//! one of the errors below. Nothing is dropped silently.
//!
//! ### Rejected Readings
//! - `UnknownSensor`: the sensor is not in the catalog. No state is created.
//! - `InvalidReading`: NaN/infinite value, or a missing/unrepresentable
//!   timestamp. Rejected before any window is touched, so a bad reading can
//!   never corrupt the running statistics.
//!
//! ### Misconfiguration
//! - `InvalidParams`: the parameters resolved for the sensor are unusable
//!   (threshold not a positive finite number, window below 2, empty
//!   history). Rejected before any state is touched.
//!
//! ### Downstream Failures
//! - `StorageFailure`: the sink refused the point. Detection state is *not*
//!   rolled back; the point is handed back so the caller can retry or log it.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use lineguard_core::{EngineError, SensorReading};
//! # use lineguard_core::{IngestionPipeline, InMemoryCatalog, EngineConfig};
//! # let pipeline = IngestionPipeline::new(InMemoryCatalog::new(), EngineConfig::default());
//!
//! match pipeline.ingest(SensorReading::new("press_01", 1_700_000_000_000, 4.2)) {
//!     Ok(point) => {
//!         // persist point
//!         # let _ = point;
//!     }
//!     Err(EngineError::UnknownSensor(id)) => {
//!         // client error upstream (HTTP 404/422)
//!         # let _ = id;
//!     }
//!     Err(EngineError::InvalidReading { .. }) => {
//!         // client error upstream (HTTP 400)
//!     }
//!     Err(EngineError::InvalidParams { source, .. }) => {
//!         // fix the catalog entry or configuration
//!         # let _ = source;
//!     }
//!     Err(EngineError::StorageFailure { point, .. }) => {
//!         // detection already happened; only persistence failed
//!         # let _ = point;
//!     }
//! }
//! ```

use thiserror_no_std::Error;

use crate::events::{AnnotatedPoint, SensorId};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Why a reading was rejected as invalid
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Value is NaN or infinite
    #[error("value is not a finite number")]
    NonFiniteValue,

    /// Reading carried no timestamp
    #[error("timestamp is missing")]
    MissingTimestamp,

    /// Timestamp cannot be represented as a UTC instant
    #[error("timestamp is out of range")]
    TimestampOutOfRange,
}

/// Errors returned by the ingestion pipeline
#[derive(Error, Debug)]
pub enum EngineError {
    /// Reading references a sensor absent from the catalog
    #[error("Unknown sensor: {0}")]
    UnknownSensor(SensorId),

    /// Reading failed basic sanity checks
    #[error("Invalid reading from {sensor}: {reason}")]
    InvalidReading {
        /// Sensor the reading claimed to come from
        sensor: SensorId,
        /// What was wrong with it
        reason: InvalidReason,
    },

    /// Parameters resolved for the sensor cannot be used for detection
    #[error("Invalid parameters for {sensor}: {source}")]
    InvalidParams {
        /// Sensor whose reading was refused
        sensor: SensorId,
        /// Offending parameter
        source: ConfigError,
    },

    /// Detection succeeded but the storage sink refused the point
    #[error("Storage failure for {}: {source}", .point.reading.sensor_id)]
    StorageFailure {
        /// The point as computed; detection state already reflects it
        point: Box<AnnotatedPoint>,
        /// Sink error
        source: SinkError,
    },
}

impl EngineError {
    /// True for errors caused by the reading itself (client errors upstream)
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::UnknownSensor(_) | Self::InvalidReading { .. })
    }
}

/// Errors reported by storage sinks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// Backend is unreachable
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected the point
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable or field could not be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable or field name
        key: String,
        /// Raw value as found
        value: String,
    },

    /// A value parsed but is outside the accepted range
    #[error("{key} out of range: {reason}")]
    OutOfRange {
        /// Variable or field name
        key: &'static str,
        /// Constraint that was violated
        reason: &'static str,
    },

    /// JSON configuration could not be decoded
    #[error("Malformed configuration: {0}")]
    Malformed(String),
}
