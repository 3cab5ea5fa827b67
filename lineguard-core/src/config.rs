//! Engine Configuration
//!
//! ## Parameter Resolution
//!
//! Detection parameters resolve in three layers, most specific first:
//!
//! ```text
//! per-sensor override (catalog entry)
//!        ↓ missing fields fall through to
//! per-type override   (generic / vibration)
//!        ↓
//! global defaults     (window 25, min samples 25, threshold 2.0, history 25)
//! ```
//!
//! Resolved parameters are checked again on every reading, so a bad
//! override registered at runtime is reported instead of silently flagging
//! everything (threshold ≤ 0) or nothing (NaN threshold).
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `Z_SCORE_THRESHOLD` | global threshold | 2.0 |
//! | `MODEL_WINDOW_SIZE` | global window size | 25 |
//! | `MIN_SAMPLES` | readings before evaluation starts | 25 |
//! | `ANOMALY_LIST_SIZE` | anomaly history capacity per sensor | 25 |
//! | `EVALUATION_ORDER` | `update_then_evaluate` or `evaluate_then_update` | `update_then_evaluate` |
//! | `GENERIC_*`, `VIBRATION_*` | per-type variants of the first four | unset |
//!
//! Unset global variables fall back to their default with a warning; a set
//! but unparsable variable is an error.
//!
//! ## Evaluation Order
//!
//! By default a reading joins its window *before* it is judged, so it is
//! compared with a baseline that contains itself. Two consequences:
//!
//! - A run of anomalies drags the mean toward itself and later readings in
//!   the run score lower.
//! - With the sample standard deviation, a value inside an n-sample window
//!   can score at most (n − 1)/√n. Windows of 5 never exceed ≈1.79.
//!
//! [`EvaluationOrder::EvaluateThenUpdate`] judges the reading against the
//! window as it stood before the reading arrived.

use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::detector::MIN_SAMPLES_FLOOR;
use crate::errors::ConfigError;
use crate::events::SensorType;

/// Global default window size
pub const DEFAULT_WINDOW_SIZE: usize = 25;

/// Global default z-score threshold
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Global default anomaly history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 25;

/// Whether a reading is judged with or without itself in the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOrder {
    /// Insert into the window, then evaluate against the updated stats
    #[default]
    UpdateThenEvaluate,
    /// Evaluate against the current stats, then insert
    EvaluateThenUpdate,
}

impl FromStr for EvaluationOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "update_then_evaluate" => Ok(Self::UpdateThenEvaluate),
            "evaluate_then_update" => Ok(Self::EvaluateThenUpdate),
            _ => Err(ConfigError::InvalidValue {
                key: "EVALUATION_ORDER".into(),
                value: s.into(),
            }),
        }
    }
}

/// Resolved detection parameters for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Values kept in the sliding window
    pub window_size: usize,
    /// Values required before the detector evaluates
    pub min_samples: usize,
    /// |z| above this is anomalous
    pub threshold: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            // The window must be full before it is trusted
            min_samples: DEFAULT_WINDOW_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl DetectionParams {
    /// Overlay any fields set in `overrides`
    pub fn with_overrides(self, overrides: &ParamOverrides) -> Self {
        Self {
            window_size: overrides.window_size.unwrap_or(self.window_size),
            min_samples: overrides.min_samples.unwrap_or(self.min_samples),
            threshold: overrides.threshold.unwrap_or(self.threshold),
        }
    }

    /// `min_samples` clamped to `[2, window_size]`
    pub fn effective_min_samples(&self) -> usize {
        let ceiling = self.window_size.max(MIN_SAMPLES_FLOOR);
        self.min_samples.clamp(MIN_SAMPLES_FLOOR, ceiling)
    }

    /// Reject parameters the detector cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < MIN_SAMPLES_FLOOR {
            return Err(ConfigError::OutOfRange {
                key: "window_size",
                reason: "must hold at least 2 samples",
            });
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "threshold",
                reason: "must be a positive finite number",
            });
        }
        Ok(())
    }
}

/// Optional per-type or per-sensor parameter overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverrides {
    /// Window size override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<usize>,
    /// Minimum samples override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_samples: Option<usize>,
    /// Threshold override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Anomaly history capacity override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_capacity: Option<usize>,
}

impl ParamOverrides {
    /// True when nothing is overridden
    pub fn is_empty(&self) -> bool {
        self.window_size.is_none()
            && self.min_samples.is_none()
            && self.threshold.is_none()
            && self.history_capacity.is_none()
    }

    /// Reject any set field the detector cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let overlaid = DetectionParams::default().with_overrides(self);
        overlaid.validate()?;
        if let Some(capacity) = self.history_capacity {
            check_history_capacity(capacity)?;
        }
        Ok(())
    }
}

pub(crate) fn check_history_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::OutOfRange {
            key: "history_capacity",
            reason: "must be at least 1",
        });
    }
    Ok(())
}

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parameters for sensors without overrides
    pub defaults: DetectionParams,
    /// Overrides for generic sensors
    pub generic: ParamOverrides,
    /// Overrides for vibration sensors
    pub vibration: ParamOverrides,
    /// Anomaly records (and verdicts for the ratio) kept per sensor
    pub history_capacity: usize,
    /// Whether readings join the baseline before being judged
    pub evaluation_order: EvaluationOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: DetectionParams::default(),
            generic: ParamOverrides::default(),
            vibration: ParamOverrides::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            evaluation_order: EvaluationOrder::default(),
        }
    }
}

impl EngineConfig {
    /// Resolve parameters for a sensor
    pub fn params_for(&self, sensor_type: SensorType, sensor_overrides: &ParamOverrides) -> DetectionParams {
        self.defaults
            .with_overrides(self.type_overrides(sensor_type))
            .with_overrides(sensor_overrides)
    }

    /// Resolve the anomaly history capacity for a sensor
    pub fn history_capacity_for(&self, sensor_type: SensorType, sensor_overrides: &ParamOverrides) -> usize {
        sensor_overrides
            .history_capacity
            .or(self.type_overrides(sensor_type).history_capacity)
            .unwrap_or(self.history_capacity)
    }

    /// Resolve and check everything a sensor's detection depends on
    pub fn resolve(
        &self,
        sensor_type: SensorType,
        sensor_overrides: &ParamOverrides,
    ) -> Result<(DetectionParams, usize), ConfigError> {
        let params = self.params_for(sensor_type, sensor_overrides);
        params.validate()?;

        let history_capacity = self.history_capacity_for(sensor_type, sensor_overrides);
        check_history_capacity(history_capacity)?;

        Ok((params, history_capacity))
    }

    /// Check every parameter layer
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        check_history_capacity(self.history_capacity)?;
        for sensor_type in [SensorType::Generic, SensorType::Vibration] {
            self.resolve(sensor_type, &ParamOverrides::default())?;
        }
        Ok(())
    }

    fn type_overrides(&self, sensor_type: SensorType) -> &ParamOverrides {
        match sensor_type {
            SensorType::Generic => &self.generic,
            SensorType::Vibration => &self.vibration,
        }
    }

    /// Load from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source using the environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.defaults.threshold = required_or_default(&lookup, "Z_SCORE_THRESHOLD", DEFAULT_THRESHOLD)?;
        config.defaults.window_size = required_or_default(&lookup, "MODEL_WINDOW_SIZE", DEFAULT_WINDOW_SIZE)?;
        config.defaults.min_samples = required_or_default(&lookup, "MIN_SAMPLES", config.defaults.window_size)?;
        config.history_capacity = required_or_default(&lookup, "ANOMALY_LIST_SIZE", DEFAULT_HISTORY_CAPACITY)?;
        config.evaluation_order = required_or_default(&lookup, "EVALUATION_ORDER", EvaluationOrder::default())?;

        config.generic = overrides_from(&lookup, "GENERIC")?;
        config.vibration = overrides_from(&lookup, "VIBRATION")?;

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn required_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match parse_var(lookup, key)? {
        Some(value) => {
            debug!("Config {} = {:?}", key, value);
            Ok(value)
        }
        None => {
            warn!("Config {} not set, using default {:?}", key, default);
            Ok(default)
        }
    }
}

fn overrides_from<F>(lookup: &F, prefix: &str) -> Result<ParamOverrides, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(ParamOverrides {
        window_size: parse_var(lookup, &format!("{}_MODEL_WINDOW_SIZE", prefix))?,
        min_samples: parse_var(lookup, &format!("{}_MIN_SAMPLES", prefix))?,
        threshold: parse_var(lookup, &format!("{}_Z_SCORE_THRESHOLD", prefix))?,
        history_capacity: parse_var(lookup, &format!("{}_ANOMALY_LIST_SIZE", prefix))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_service_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.defaults.window_size, 25);
        assert_eq!(config.defaults.threshold, 2.0);
        assert_eq!(config.history_capacity, 25);
        assert_eq!(config.evaluation_order, EvaluationOrder::UpdateThenEvaluate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn layers_resolve_most_specific_first() {
        let config = EngineConfig {
            vibration: ParamOverrides {
                window_size: Some(50),
                threshold: Some(3.0),
                ..Default::default()
            },
            ..Default::default()
        };

        let generic = config.params_for(SensorType::Generic, &ParamOverrides::default());
        assert_eq!(generic, DetectionParams::default());

        let sensor = ParamOverrides {
            threshold: Some(4.0),
            ..Default::default()
        };
        let vib = config.params_for(SensorType::Vibration, &sensor);
        assert_eq!(vib.window_size, 50);
        assert_eq!(vib.min_samples, 25);
        assert_eq!(vib.threshold, 4.0);
    }

    #[test]
    fn min_samples_clamped_to_window() {
        let params = DetectionParams {
            window_size: 5,
            min_samples: 25,
            threshold: 2.0,
        };
        assert_eq!(params.effective_min_samples(), 5);

        let params = DetectionParams { min_samples: 0, ..params };
        assert_eq!(params.effective_min_samples(), 2);
    }

    #[test]
    fn rejects_unusable_parameters() {
        let zero_threshold = DetectionParams {
            threshold: 0.0,
            ..Default::default()
        };
        assert!(zero_threshold.validate().is_err());

        let tiny_window = DetectionParams {
            window_size: 1,
            ..Default::default()
        };
        assert!(tiny_window.validate().is_err());

        let config = EngineConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_lookup_with_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("Z_SCORE_THRESHOLD", "2.5"),
            ("MODEL_WINDOW_SIZE", "40"),
            ("ANOMALY_LIST_SIZE", "10"),
            ("EVALUATION_ORDER", "evaluate_then_update"),
            ("VIBRATION_Z_SCORE_THRESHOLD", "3.5"),
            ("VIBRATION_ANOMALY_LIST_SIZE", "4"),
        ]))
        .unwrap();

        assert_eq!(config.defaults.threshold, 2.5);
        assert_eq!(config.defaults.window_size, 40);
        assert_eq!(config.defaults.min_samples, 40);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.evaluation_order, EvaluationOrder::EvaluateThenUpdate);
        assert_eq!(config.vibration.threshold, Some(3.5));
        assert_eq!(config.vibration.history_capacity, Some(4));
        assert!(config.generic.is_empty());

        let none = ParamOverrides::default();
        assert_eq!(config.history_capacity_for(SensorType::Generic, &none), 10);
        assert_eq!(config.history_capacity_for(SensorType::Vibration, &none), 4);
    }

    #[test]
    fn history_capacity_layers() {
        let config = EngineConfig {
            generic: ParamOverrides {
                history_capacity: Some(50),
                ..Default::default()
            },
            ..Default::default()
        };
        let none = ParamOverrides::default();
        assert_eq!(config.history_capacity_for(SensorType::Generic, &none), 50);
        assert_eq!(config.history_capacity_for(SensorType::Vibration, &none), 25);

        let sensor = ParamOverrides {
            history_capacity: Some(3),
            ..Default::default()
        };
        assert_eq!(config.history_capacity_for(SensorType::Generic, &sensor), 3);

        let broken = EngineConfig {
            vibration: ParamOverrides {
                history_capacity: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            broken.validate(),
            Err(ConfigError::OutOfRange { key: "history_capacity", .. })
        ));
    }

    #[test]
    fn resolve_rejects_bad_overrides() {
        let config = EngineConfig::default();
        for threshold in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let sensor = ParamOverrides {
                threshold: Some(threshold),
                ..Default::default()
            };
            assert!(sensor.validate().is_err());
            assert!(matches!(
                config.resolve(SensorType::Generic, &sensor),
                Err(ConfigError::OutOfRange { key: "threshold", .. })
            ));
        }

        let (params, history) = config.resolve(SensorType::Vibration, &ParamOverrides::default()).unwrap();
        assert_eq!(params, DetectionParams::default());
        assert_eq!(history, 25);
    }

    #[test]
    fn env_lookup_rejects_garbage() {
        let err = EngineConfig::from_lookup(lookup_from(&[("MODEL_WINDOW_SIZE", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "MODEL_WINDOW_SIZE".into(),
                value: "lots".into(),
            }
        );

        let err = EngineConfig::from_lookup(lookup_from(&[("Z_SCORE_THRESHOLD", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "threshold", .. }));
    }

    #[test]
    fn json_partial_config() {
        let config = EngineConfig::from_json_str(
            r#"{ "defaults": { "threshold": 3.0 }, "vibration": { "window_size": 100 } }"#,
        )
        .unwrap();
        assert_eq!(config.defaults.threshold, 3.0);
        assert_eq!(config.defaults.window_size, 25);
        assert_eq!(config.vibration.window_size, Some(100));

        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ConfigError::Malformed(_))
        ));
    }
}
