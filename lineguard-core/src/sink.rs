//! In-process storage sinks
//!
//! - [`MemorySink`] keeps every point it is given, for tests and replay.
//! - [`NullSink`] discards everything.
//!
//! Network sinks live in `lineguard-connectors`.

use std::sync::Mutex;

use crate::errors::SinkError;
use crate::events::AnnotatedPoint;
use crate::sync;
use crate::traits::StorageSink;

/// Sink that stores points in a vector
///
/// ## Example
///
/// ```rust
/// use lineguard_core::{
///     EngineConfig, InMemoryCatalog, IngestionPipeline, MemorySink, SensorProfile, SensorReading,
/// };
///
/// let catalog = InMemoryCatalog::new();
/// catalog.register("temp_01", SensorProfile::generic());
/// let pipeline = IngestionPipeline::new(catalog, EngineConfig::default());
///
/// let sink = MemorySink::new();
/// pipeline
///     .ingest_and_store(SensorReading::new("temp_01", 1_000, 21.5), &sink)
///     .unwrap();
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    points: Mutex<Vec<AnnotatedPoint>>,
    fail_with: Mutex<Option<SinkError>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every point written so far
    pub fn points(&self) -> Vec<AnnotatedPoint> {
        sync::lock(&self.points).clone()
    }

    /// Take every point written so far
    pub fn drain(&self) -> Vec<AnnotatedPoint> {
        std::mem::take(&mut *sync::lock(&self.points))
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        sync::lock(&self.points).len()
    }

    /// Check if nothing was written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make subsequent writes fail with `error`; `None` restores normal writes
    pub fn fail_writes(&self, error: Option<SinkError>) {
        *sync::lock(&self.fail_with) = error;
    }
}

impl StorageSink for MemorySink {
    fn write(&self, point: &AnnotatedPoint) -> Result<(), SinkError> {
        if let Some(error) = sync::lock(&self.fail_with).clone() {
            return Err(error);
        }
        sync::lock(&self.points).push(point.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Sink that drops every point
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StorageSink for NullSink {
    fn write(&self, _point: &AnnotatedPoint) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
