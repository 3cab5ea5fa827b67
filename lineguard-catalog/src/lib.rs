//! Sensor Lists for LineGuard
//!
//! ## Overview
//!
//! Which sensors get anomaly detection is decided by two JSON files, one per
//! sensor type:
//!
//! | File | Sensor type |
//! |---|---|
//! | `analytics_generic_sensors.json` | [`SensorType::Generic`] |
//! | `analytics_vibration_sensors.json` | [`SensorType::Vibration`] |
//!
//! Both share one format. An entry is either a bare name or an object that
//! also overrides detection parameters for that sensor:
//!
//! ```json
//! {
//!   "sensors": [
//!     "press_01",
//!     { "name": "temp_07", "threshold": 3.0 },
//!     { "name": "flow_02", "window_size": 100, "min_samples": 50, "history_capacity": 10 }
//!   ]
//! }
//! ```
//!
//! ## Loading Rules
//!
//! - A missing file is logged and treated as an empty list. A line can run
//!   with vibration analytics only, or none at all.
//! - A file that exists but does not parse is an error.
//! - A sensor listed twice, in one file or across both, is an error. The
//!   type of a sensor must never depend on load order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lineguard_catalog::CatalogLoader;
//! use lineguard_core::{EngineConfig, IngestionPipeline};
//!
//! let catalog = CatalogLoader::from_dir("/etc/lineguard").load()?;
//! let pipeline = IngestionPipeline::new(catalog, EngineConfig::from_env()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`SensorType::Generic`]: lineguard_core::SensorType::Generic
//! [`SensorType::Vibration`]: lineguard_core::SensorType::Vibration

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use lineguard_core::SensorId;

pub mod format;
pub mod loader;

pub use format::{SensorEntry, SensorList};
pub use loader::{CatalogLoader, GENERIC_SENSORS_FILE, VIBRATION_SENSORS_FILE};

/// Catalog loading errors
#[derive(Debug, thiserror_no_std::Error)]
pub enum CatalogError {
    /// File exists but could not be read
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File content is not a valid sensor list
    #[error("Malformed sensor list {origin}: {source}")]
    Parse {
        /// File path or other description of the input
        origin: String,
        /// JSON error
        source: serde_json::Error,
    },

    /// The same sensor appears more than once
    #[error("Sensor listed more than once: {0}")]
    DuplicateSensor(SensorId),

    /// An entry cannot be used for detection
    #[error("Invalid entry for {sensor:?}: {reason}")]
    InvalidEntry {
        /// Sensor name as written
        sensor: String,
        /// What is wrong with it
        reason: &'static str,
    },
}
