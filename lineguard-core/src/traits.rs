//! Seams between the engine and the outside world
//!
//! The engine only ever *reads* the catalog and only ever *writes* to a
//! sink. Both traits take `&self` so one instance can be shared by every
//! ingesting thread; implementations provide their own interior locking.

use std::sync::Arc;

use crate::catalog::SensorProfile;
use crate::errors::SinkError;
use crate::events::AnnotatedPoint;

/// Source of truth for which sensors exist and how to treat them
pub trait SensorCatalog: Send + Sync {
    /// Profile of a sensor, `None` if it is not catalogued
    fn lookup(&self, sensor_id: &str) -> Option<SensorProfile>;

    /// Check if a sensor is catalogued
    fn contains(&self, sensor_id: &str) -> bool {
        self.lookup(sensor_id).is_some()
    }
}

impl<C: SensorCatalog + ?Sized> SensorCatalog for Arc<C> {
    fn lookup(&self, sensor_id: &str) -> Option<SensorProfile> {
        (**self).lookup(sensor_id)
    }
}

impl<C: SensorCatalog + ?Sized> SensorCatalog for &C {
    fn lookup(&self, sensor_id: &str) -> Option<SensorProfile> {
        (**self).lookup(sensor_id)
    }
}

/// Destination for annotated points
pub trait StorageSink: Send + Sync {
    /// Persist one point
    fn write(&self, point: &AnnotatedPoint) -> Result<(), SinkError>;

    /// Sink name for logs
    fn name(&self) -> &'static str {
        "sink"
    }
}

impl<S: StorageSink + ?Sized> StorageSink for Arc<S> {
    fn write(&self, point: &AnnotatedPoint) -> Result<(), SinkError> {
        (**self).write(point)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
