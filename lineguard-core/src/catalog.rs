//! In-memory sensor catalog
//!
//! A [`SensorProfile`] says what kind of sensor an identifier names and
//! which parameters, if any, it overrides. [`InMemoryCatalog`] is the
//! default [`SensorCatalog`]: a map behind an `RwLock`, so lookups from
//! many ingesting threads share the lock and registration is rare.

use std::collections::HashMap;
use std::sync::RwLock;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ParamOverrides;
use crate::events::{SensorId, SensorType};
use crate::sync;
use crate::traits::SensorCatalog;

/// What the catalog knows about one sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    /// Sensor class
    pub sensor_type: SensorType,
    /// Per-sensor parameter overrides
    #[serde(default)]
    pub overrides: ParamOverrides,
}

impl SensorProfile {
    /// Profile with no overrides
    pub fn new(sensor_type: SensorType) -> Self {
        Self {
            sensor_type,
            overrides: ParamOverrides::default(),
        }
    }

    /// Generic sensor with no overrides
    pub fn generic() -> Self {
        Self::new(SensorType::Generic)
    }

    /// Vibration sensor with no overrides
    pub fn vibration() -> Self {
        Self::new(SensorType::Vibration)
    }

    /// Attach overrides
    pub fn with_overrides(mut self, overrides: ParamOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Thread-safe sensor catalog
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    sensors: RwLock<HashMap<SensorId, SensorProfile>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sensor; returns the previous profile
    pub fn register(&self, sensor_id: impl Into<SensorId>, profile: SensorProfile) -> Option<SensorProfile> {
        let sensor_id = sensor_id.into();
        info!("Registering {} sensor {}", profile.sensor_type.name(), sensor_id);
        sync::write(&self.sensors).insert(sensor_id, profile)
    }

    /// Remove a sensor; returns its profile if it was present
    pub fn remove(&self, sensor_id: &str) -> Option<SensorProfile> {
        sync::write(&self.sensors).remove(sensor_id)
    }

    /// Number of catalogued sensors
    pub fn len(&self) -> usize {
        sync::read(&self.sensors).len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Catalogued sensor identifiers, sorted
    pub fn sensor_ids(&self) -> Vec<SensorId> {
        let mut ids: Vec<SensorId> = sync::read(&self.sensors).keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl SensorCatalog for InMemoryCatalog {
    fn lookup(&self, sensor_id: &str) -> Option<SensorProfile> {
        sync::read(&self.sensors).get(sensor_id).copied()
    }
}

impl FromIterator<(SensorId, SensorProfile)> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = (SensorId, SensorProfile)>>(iter: I) -> Self {
        Self {
            sensors: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_lookup_remove() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.lookup("press_01").is_none());

        assert!(catalog.register("press_01", SensorProfile::generic()).is_none());
        assert!(catalog.contains("press_01"));
        assert_eq!(catalog.lookup("press_01").unwrap().sensor_type, SensorType::Generic);

        let previous = catalog.register("press_01", SensorProfile::vibration());
        assert_eq!(previous, Some(SensorProfile::generic()));
        assert_eq!(catalog.len(), 1);

        assert!(catalog.remove("press_01").is_some());
        assert!(catalog.is_empty());
    }

    #[test]
    fn collects_from_pairs() {
        let catalog: InMemoryCatalog = [
            ("b".to_string(), SensorProfile::vibration()),
            ("a".to_string(), SensorProfile::generic()),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.sensor_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn profile_json_defaults_overrides() {
        let profile: SensorProfile = serde_json::from_str(r#"{ "sensor_type": "vibration" }"#).unwrap();
        assert_eq!(profile, SensorProfile::vibration());
        assert!(profile.overrides.is_empty());
    }
}
