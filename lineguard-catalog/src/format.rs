//! On-disk sensor list format

use serde::{Deserialize, Serialize};

use lineguard_core::ParamOverrides;

use crate::CatalogError;

/// Contents of one sensor list file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorList {
    /// Listed sensors, in file order
    #[serde(default)]
    pub sensors: Vec<SensorEntry>,
}

impl SensorList {
    /// Parse a list; `origin` names the input in errors
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|source| CatalogError::Parse {
            origin: origin.to_string(),
            source,
        })
    }
}

/// One listed sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorEntry {
    /// Bare sensor name
    Name(String),
    /// Sensor name with parameter overrides
    Detailed {
        /// Sensor name
        name: String,
        /// Parameters this sensor overrides
        #[serde(flatten)]
        overrides: ParamOverrides,
    },
}

impl SensorEntry {
    /// Sensor name
    pub fn name(&self) -> &str {
        match self {
            SensorEntry::Name(name) | SensorEntry::Detailed { name, .. } => name,
        }
    }

    /// Overrides, empty for bare names
    pub fn overrides(&self) -> ParamOverrides {
        match self {
            SensorEntry::Name(_) => ParamOverrides::default(),
            SensorEntry::Detailed { overrides, .. } => *overrides,
        }
    }

    /// Reject entries the engine could not run detection for
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason| CatalogError::InvalidEntry {
            sensor: self.name().to_string(),
            reason,
        };

        if self.name().trim().is_empty() {
            return Err(invalid("name is empty"));
        }

        let overrides = self.overrides();
        if overrides.window_size.is_some_and(|w| w < 2) {
            return Err(invalid("window_size must be at least 2"));
        }
        if overrides.threshold.is_some_and(|t| !t.is_finite() || t <= 0.0) {
            return Err(invalid("threshold must be a positive finite number"));
        }
        if overrides.history_capacity == Some(0) {
            return Err(invalid("history_capacity must be at least 1"));
        }
        Ok(())
    }
}
