//! Sample aggregation
//!
//! Pure reductions from raw attempt timings to the statistics carried by
//! measurement records. Nothing here touches the network.

use crate::prober::SampleSet;
use netscope_common::{round_to, SENTINEL_MS};
use std::time::Duration;

/// Milliseconds as a float.
#[inline]
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Arithmetic mean, `None` for an empty slice.
#[inline]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean absolute difference between consecutive samples, 2 decimals.
pub fn jitter_ms(times_ms: &[f64]) -> f64 {
    if times_ms.len() < 2 {
        return 0.0;
    }
    let diffs: Vec<f64> = times_ms.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    mean(&diffs).map(|j| round_to(j, 2)).unwrap_or(0.0)
}

/// Timing consistency in `[0, 100]`, 1 decimal.
///
/// `100 - CV * 100` where CV is population stddev over mean. Zero with
/// fewer than two samples or a zero mean.
pub fn stability_score(times_ms: &[f64]) -> f64 {
    if times_ms.len() < 2 {
        return 0.0;
    }
    let avg = match mean(times_ms) {
        Some(avg) if avg > 0.0 => avg,
        _ => return 0.0,
    };
    let variance =
        times_ms.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / times_ms.len() as f64;
    let cv = variance.sqrt() / avg;
    round_to((100.0 - cv * 100.0).clamp(0.0, 100.0), 1)
}

/// Statistics for one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    /// Mean of successful samples
    pub avg_ms: f64,
    /// Fastest sample
    pub min_ms: f64,
    /// Slowest sample
    pub max_ms: f64,
    /// Consecutive-sample jitter
    pub jitter_ms: f64,
    /// Timing consistency
    pub stability_score: f64,
    /// Successful samples
    pub successes: u32,
    /// Attempts made
    pub attempts: u32,
}

impl TimingStats {
    /// Reduce successful timings (in attempt order) and a failure count.
    pub fn from_samples(times_ms: &[f64], failures: u32) -> Self {
        let successes = times_ms.len() as u32;
        let attempts = successes + failures;

        let Some(avg) = mean(times_ms) else {
            return Self {
                avg_ms: SENTINEL_MS,
                min_ms: SENTINEL_MS,
                max_ms: SENTINEL_MS,
                jitter_ms: 0.0,
                stability_score: 0.0,
                successes,
                attempts,
            };
        };

        let min = times_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            avg_ms: round_to(avg, 2),
            min_ms: round_to(min, 2),
            max_ms: round_to(max, 2),
            jitter_ms: jitter_ms(times_ms),
            stability_score: stability_score(times_ms),
            successes,
            attempts,
        }
    }

    /// Reduce a prober sample set of elapsed times.
    pub fn from_set(set: &SampleSet<Duration>) -> Self {
        let times: Vec<f64> = set.successes.iter().copied().map(duration_ms).collect();
        Self::from_samples(&times, set.failures)
    }

    /// At least one sample succeeded
    #[inline]
    pub fn reachable(&self) -> bool {
        self.successes > 0
    }

    /// Failed attempts
    #[inline]
    pub fn failures(&self) -> u32 {
        self.attempts - self.successes
    }

    /// Share of successful attempts, 1 decimal
    pub fn reliability_pct(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        round_to(self.successes as f64 / self.attempts as f64 * 100.0, 1)
    }

    /// Share of failed attempts, 2 decimals
    pub fn packet_loss_pct(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        round_to(self.failures() as f64 / self.attempts as f64 * 100.0, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_successes_use_sentinel() {
        let stats = TimingStats::from_samples(&[], 5);
        assert!(!stats.reachable());
        assert_eq!(stats.avg_ms, SENTINEL_MS);
        assert_eq!(stats.min_ms, SENTINEL_MS);
        assert_eq!(stats.max_ms, SENTINEL_MS);
        assert_eq!(stats.stability_score, 0.0);
        assert_eq!(stats.packet_loss_pct(), 100.0);
        assert_eq!(stats.reliability_pct(), 0.0);
    }

    #[test]
    fn test_basic_statistics() {
        let stats = TimingStats::from_samples(&[10.0, 20.0, 15.0], 1);
        assert!(stats.reachable());
        assert_eq!(stats.avg_ms, 15.0);
        assert_eq!(stats.min_ms, 10.0);
        assert_eq!(stats.max_ms, 20.0);
        // |20-10| and |15-20|
        assert_eq!(stats.jitter_ms, 7.5);
        assert_eq!(stats.packet_loss_pct(), 25.0);
        assert_eq!(stats.reliability_pct(), 75.0);
    }

    #[test]
    fn test_single_success_has_no_stability() {
        let stats = TimingStats::from_samples(&[42.0], 2);
        assert_eq!(stats.stability_score, 0.0);
        assert_eq!(stats.jitter_ms, 0.0);
    }

    #[test]
    fn test_identical_samples_are_fully_stable() {
        assert_eq!(stability_score(&[30.0, 30.0, 30.0]), 100.0);
        assert_eq!(stability_score(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_from_set_converts_durations() {
        let set = SampleSet {
            successes: vec![Duration::from_millis(12), Duration::from_millis(18)],
            failures: 0,
        };
        let stats = TimingStats::from_set(&set);
        assert_eq!(stats.avg_ms, 15.0);
        assert_eq!(stats.attempts, 2);
    }

    proptest! {
        #[test]
        fn prop_stability_in_range(times in prop::collection::vec(0.0f64..10_000.0, 0..40)) {
            let score = stability_score(&times);
            prop_assert!((0.0..=100.0).contains(&score));
            if times.len() < 2 {
                prop_assert_eq!(score, 0.0);
            }
        }

        #[test]
        fn prop_aggregation_is_idempotent(
            times in prop::collection::vec(0.1f64..5_000.0, 0..20),
            failures in 0u32..10,
        ) {
            let first = TimingStats::from_samples(&times, failures);
            let second = TimingStats::from_samples(&times, failures);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.reachable(), !times.is_empty());
            if !first.reachable() {
                prop_assert_eq!(first.avg_ms, SENTINEL_MS);
                prop_assert_eq!(first.stability_score, 0.0);
            } else {
                prop_assert!(first.min_ms <= first.avg_ms && first.avg_ms <= first.max_ms);
            }
        }
    }
}
