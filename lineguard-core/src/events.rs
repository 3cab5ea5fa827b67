//! Data Types Flowing Through the Engine
//!
//! ## Overview
//!
//! Data flows one way through LineGuard:
//!
//! ```text
//! SensorReading ──► IngestionPipeline ──► AnnotatedPoint ──► StorageSink
//!                         │
//!                         └──► AnomalyRecord (kept in AnomalyHistory)
//! ```
//!
//! - [`SensorReading`] is produced by a machine gateway, immutable, and
//!   consumed exactly once.
//! - [`AnnotatedPoint`] is the reading plus the detector's opinion of it.
//!   Every accepted reading yields one, anomalous or not, because every
//!   reading is persisted.
//! - [`AnomalyRecord`] is the compact note kept in memory for status
//!   queries when a reading is flagged.
//!
//! ## Vibration Sensors
//!
//! Vibration sensors report three axis RMS accelerations. The detector works
//! on scalars, so the axes are reduced to the total RMS
//! `sqrt(x² + y² + z²)` when the reading is built. The axes ride along for
//! storage.
//!
//! ```rust
//! use lineguard_core::events::{SensorReading, VibrationAxes};
//!
//! let reading = SensorReading::vibration(
//!     "vib_01",
//!     1_700_000_000_000,
//!     VibrationAxes { x: 3.0, y: 4.0, z: 12.0 },
//! );
//! assert_eq!(reading.value, 13.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::detector::Verdict;
use crate::errors::InvalidReason;
use crate::time::{self, Timestamp};

/// Opaque sensor identifier, key for all per-sensor state
pub type SensorId = String;

/// Sensor class; selects detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// Generic process sensor (pressure, temperature, current, ...)
    Generic,
    /// Three-axis vibration sensor, reduced to total RMS
    Vibration,
}

impl SensorType {
    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            SensorType::Generic => "generic",
            SensorType::Vibration => "vibration",
        }
    }
}

/// Per-axis RMS acceleration of a vibration sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibrationAxes {
    /// X-axis RMS acceleration
    pub x: f64,
    /// Y-axis RMS acceleration
    pub y: f64,
    /// Z-axis RMS acceleration
    pub z: f64,
}

impl VibrationAxes {
    /// Total RMS across the three axes
    pub fn total_rms(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Single reading as received from a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Reporting sensor
    pub sensor_id: SensorId,

    /// Milliseconds since epoch; `None` when the sender omitted it
    pub timestamp: Option<Timestamp>,

    /// Scalar the detector evaluates
    pub value: f64,

    /// Production line the machine belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_name: Option<String>,

    /// Machine the sensor is mounted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,

    /// Raw axes for vibration readings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<VibrationAxes>,
}

impl SensorReading {
    /// Create a scalar reading
    pub fn new(sensor_id: impl Into<SensorId>, timestamp: Timestamp, value: f64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp: Some(timestamp),
            value,
            line_name: None,
            machine_name: None,
            axes: None,
        }
    }

    /// Create a reading that arrived without a timestamp
    pub fn untimed(sensor_id: impl Into<SensorId>, value: f64) -> Self {
        Self {
            timestamp: None,
            ..Self::new(sensor_id, 0, value)
        }
    }

    /// Create a vibration reading; the value is the total RMS of the axes
    pub fn vibration(sensor_id: impl Into<SensorId>, timestamp: Timestamp, axes: VibrationAxes) -> Self {
        Self {
            axes: Some(axes),
            ..Self::new(sensor_id, timestamp, axes.total_rms())
        }
    }

    /// Attach line and machine names
    pub fn with_source(mut self, line_name: impl Into<String>, machine_name: impl Into<String>) -> Self {
        self.line_name = Some(line_name.into());
        self.machine_name = Some(machine_name.into());
        self
    }

    /// Check the reading can safely enter a window
    ///
    /// Returns the timestamp on success.
    pub fn validate(&self) -> Result<Timestamp, InvalidReason> {
        if !self.value.is_finite() {
            return Err(InvalidReason::NonFiniteValue);
        }

        let timestamp = self.timestamp.ok_or(InvalidReason::MissingTimestamp)?;
        if time::to_utc(timestamp).is_none() {
            return Err(InvalidReason::TimestampOutOfRange);
        }

        Ok(timestamp)
    }
}

/// A reading whose |z-score| exceeded its sensor's threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Flagged sensor
    pub sensor_id: SensorId,
    /// Time of the flagged reading
    pub timestamp: Timestamp,
    /// Flagged value
    pub value: f64,
    /// Computed z-score (finite; zero-variance deviations use the sentinel)
    pub z_score: f64,
    /// Threshold in effect when flagged
    pub threshold: f64,
}

/// Reading annotated with the detection result, ready for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPoint {
    /// The reading as received
    pub reading: SensorReading,

    /// Class of the reporting sensor
    pub sensor_type: SensorType,

    /// Whether the detector flagged this reading
    pub is_anomaly: bool,

    /// Z-score, `None` while the window is still warming up
    pub z_score: Option<f64>,

    /// Window mean the reading was judged against
    pub model_avg: f64,

    /// Threshold in effect
    pub threshold: f64,

    /// Fraction of recent evaluated readings that were anomalous
    pub anomaly_ratio: f64,
}

impl AnnotatedPoint {
    /// Build a point from a verdict
    pub fn new(
        reading: SensorReading,
        sensor_type: SensorType,
        verdict: Verdict,
        model_avg: f64,
        threshold: f64,
        anomaly_ratio: f64,
    ) -> Self {
        Self {
            reading,
            sensor_type,
            is_anomaly: verdict.is_anomalous(),
            z_score: verdict.z_score(),
            model_avg,
            threshold,
            anomaly_ratio,
        }
    }

    /// Reading time as a UTC instant
    pub fn datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.reading.timestamp.and_then(time::to_utc)
    }
}
