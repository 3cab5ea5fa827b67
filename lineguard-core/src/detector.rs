//! Z-Score Detector
//!
//! Judges one value against a window's statistics:
//!
//! ```text
//! z = (value − mean) / stddev        anomalous iff |z| > threshold
//! ```
//!
//! Two guards sit in front of the division:
//!
//! 1. **Warm-up**: fewer than `min_samples` values in the window gives
//!    [`Verdict::NotEvaluated`]. An estimate from two or three samples is
//!    too unstable to flag anything.
//! 2. **Zero variance**: when every value in the window is identical, an
//!    equal value is normal and any deviation is infinitely significant.
//!    Infinity must not leak into storage or dashboards, so the deviation
//!    is scored with the finite [`ZERO_VARIANCE_Z_SCORE`], signed by its
//!    direction.
//!
//! The detector holds no state. Evaluating the same value against the same
//! stats always gives the same verdict.

use serde::{Deserialize, Serialize};

use crate::window::WindowStats;

/// Score reported for a deviation from a zero-variance window
pub const ZERO_VARIANCE_Z_SCORE: f64 = 1.0e9;

/// Lowest `min_samples` the detector honours; a stddev needs two points
pub const MIN_SAMPLES_FLOOR: usize = 2;

/// Relative tolerance under which a stddev counts as zero
///
/// Sliding Welford updates leave residue around 1e-15 relative to the mean
/// when a window is refilled with a constant.
const ZERO_VARIANCE_EPSILON: f64 = 1.0e-12;

/// Outcome of evaluating a single value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "z_score", rename_all = "snake_case")]
pub enum Verdict {
    /// Window too small to judge
    NotEvaluated,
    /// Within threshold
    Normal(f64),
    /// Beyond threshold
    Anomalous(f64),
}

impl Verdict {
    /// True only for [`Verdict::Anomalous`]
    pub fn is_anomalous(&self) -> bool {
        matches!(self, Verdict::Anomalous(_))
    }

    /// True unless the window was still warming up
    pub fn is_evaluated(&self) -> bool {
        !matches!(self, Verdict::NotEvaluated)
    }

    /// Computed z-score, if any
    pub fn z_score(&self) -> Option<f64> {
        match *self {
            Verdict::NotEvaluated => None,
            Verdict::Normal(z) | Verdict::Anomalous(z) => Some(z),
        }
    }
}

/// Stateless z-score evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScoreDetector;

impl ZScoreDetector {
    /// Evaluate `value` against `stats`
    ///
    /// `min_samples` below [`MIN_SAMPLES_FLOOR`] is raised to it.
    pub fn evaluate(&self, value: f64, stats: &WindowStats, min_samples: usize, threshold: f64) -> Verdict {
        if stats.sample_count < min_samples.max(MIN_SAMPLES_FLOOR) {
            return Verdict::NotEvaluated;
        }

        let deviation = value - stats.mean;
        let tolerance = ZERO_VARIANCE_EPSILON * stats.mean.abs().max(1.0);

        if stats.stddev <= tolerance {
            if deviation.abs() <= tolerance {
                return Verdict::Normal(0.0);
            }
            return Verdict::Anomalous(ZERO_VARIANCE_Z_SCORE.copysign(deviation));
        }

        let z = deviation / stats.stddev;
        if z.abs() > threshold {
            Verdict::Anomalous(z)
        } else {
            Verdict::Normal(z)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stats(sample_count: usize, mean: f64, stddev: f64) -> WindowStats {
        WindowStats {
            sample_count,
            capacity: 25,
            mean,
            stddev,
        }
    }

    #[test]
    fn warm_up_is_not_evaluated() {
        let detector = ZScoreDetector;
        let s = stats(4, 10.0, 1.0);
        assert_eq!(detector.evaluate(1000.0, &s, 5, 2.0), Verdict::NotEvaluated);
        assert!(detector.evaluate(1000.0, &s, 4, 2.0).is_anomalous());
    }

    #[test]
    fn min_samples_floor_is_two() {
        let detector = ZScoreDetector;
        let s = stats(1, 10.0, 0.0);
        assert_eq!(detector.evaluate(50.0, &s, 0, 2.0), Verdict::NotEvaluated);
    }

    #[test]
    fn zero_variance_equal_value_is_normal() {
        let detector = ZScoreDetector;
        let s = stats(5, 10.0, 0.0);
        assert_eq!(detector.evaluate(10.0, &s, 3, 2.5), Verdict::Normal(0.0));
    }

    #[test]
    fn zero_variance_deviation_uses_finite_sentinel() {
        let detector = ZScoreDetector;
        let s = stats(5, 10.0, 0.0);

        let up = detector.evaluate(50.0, &s, 3, 2.5);
        assert_eq!(up, Verdict::Anomalous(ZERO_VARIANCE_Z_SCORE));

        let down = detector.evaluate(-3.0, &s, 3, 2.5);
        assert_eq!(down, Verdict::Anomalous(-ZERO_VARIANCE_Z_SCORE));

        assert!(up.z_score().unwrap().is_finite());
    }

    #[test]
    fn residual_variance_counts_as_zero() {
        let detector = ZScoreDetector;
        let s = stats(5, 1000.0, 1.0e-13);
        assert_eq!(detector.evaluate(1000.0, &s, 3, 2.0), Verdict::Normal(0.0));
    }

    #[test]
    fn threshold_is_strict() {
        let detector = ZScoreDetector;
        let s = stats(10, 0.0, 1.0);
        assert_eq!(detector.evaluate(2.0, &s, 3, 2.0), Verdict::Normal(2.0));
        assert_eq!(detector.evaluate(-2.5, &s, 3, 2.0), Verdict::Anomalous(-2.5));
    }

    proptest! {
        #[test]
        fn evaluation_is_pure(
            value in -1.0e6f64..1.0e6,
            count in 0usize..50,
            mean in -1.0e3f64..1.0e3,
            stddev in 0.0f64..1.0e3,
            threshold in 0.5f64..5.0,
        ) {
            let detector = ZScoreDetector;
            let s = stats(count, mean, stddev);
            let first = detector.evaluate(value, &s, 5, threshold);
            let second = detector.evaluate(value, &s, 5, threshold);
            prop_assert_eq!(first, second);
            if let Some(z) = first.z_score() {
                prop_assert!(z.is_finite());
            }
        }

        #[test]
        fn below_min_samples_never_evaluates(
            value in proptest::num::f64::NORMAL,
            count in 0usize..10,
        ) {
            let s = stats(count, 0.0, 1.0);
            prop_assert_eq!(ZScoreDetector.evaluate(value, &s, 10, 2.0), Verdict::NotEvaluated);
        }
    }
}
