//! Time handling for sensor readings
//!
//! Readings arrive stamped by the PLC or gateway in milliseconds since the
//! Unix epoch. The engine never stamps readings itself; a reading without a
//! timestamp is rejected. Clock sources exist for callers (simulators,
//! replay tools, tests) that need to produce timestamps.

use chrono::{DateTime, Utc};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Convert a millisecond timestamp to a UTC instant
///
/// Returns `None` when the value is beyond what `chrono` can represent.
pub fn to_utc(timestamp: Timestamp) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(timestamp).ok()?;
    DateTime::from_timestamp_millis(millis)
}

/// Source of time for reading producers
pub trait TimeSource {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        // Pre-epoch clocks clamp to zero
        Utc::now().timestamp_millis().max(0) as Timestamp
    }
}

/// Manually driven clock for tests and replay
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Start the clock at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute time
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        self.timestamp = self.timestamp.saturating_add(ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_epoch_millis() {
        let dt = to_utc(1_700_000_000_123).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn rejects_unrepresentable_timestamps() {
        assert!(to_utc(u64::MAX).is_none());
        assert!(to_utc(i64::MAX as u64).is_none());
    }

    #[test]
    fn fixed_time_advances() {
        let mut clock = FixedTime::new(1000);
        clock.advance(250);
        assert_eq!(clock.now(), 1250);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn system_time_is_after_2020() {
        assert!(SystemTime.now() > 1_577_836_800_000);
    }
}
