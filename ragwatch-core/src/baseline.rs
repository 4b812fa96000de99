//! Baseline construction and control-limit derivation.

use chrono::Utc;
use tracing::debug;

use crate::error::{RagwatchError, Result};
use crate::stats::mean_and_std_dev;
use crate::types::{ControlLimits, RagBaseline, RagStatistics};

impl RagBaseline {
    /// A fresh baseline from a statistics snapshot.
    pub fn from_statistics(statistics: &RagStatistics, limits: Option<ControlLimits>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            success_rate: statistics.success_rate,
            avg_relevance_score: statistics.avg_relevance_score,
            avg_latency_ms: statistics.avg_latency_ms,
            control_limits: limits,
        }
    }
}

/// Create or refresh a baseline.
///
/// `created_at` survives refreshes; `updated_at` is always reset to now.
pub fn update_baseline(
    existing: Option<&RagBaseline>,
    statistics: &RagStatistics,
    limits: ControlLimits,
) -> RagBaseline {
    let mut baseline = RagBaseline::from_statistics(statistics, Some(limits));
    if let Some(previous) = existing {
        baseline.created_at = previous.created_at;
    }
    debug!(
        success_rate = baseline.success_rate,
        relevance = baseline.avg_relevance_score,
        latency_ms = baseline.avg_latency_ms,
        refreshed = existing.is_some(),
        "Baseline updated"
    );
    baseline
}

impl ControlLimits {
    /// Limits at `sigma` standard deviations around the historical mean.
    ///
    /// Rate lower bounds are clamped to [0, 1] and the latency upper bound
    /// to be non-negative. Empty snapshots are ignored; fewer than two
    /// non-empty snapshots is a validation error since no spread exists.
    pub fn from_history(history: &[RagStatistics], sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(RagwatchError::configuration(format!(
                "sigma must be positive, got {sigma}"
            )));
        }

        let populated: Vec<&RagStatistics> = history.iter().filter(|s| !s.is_empty()).collect();
        if populated.len() < 2 {
            return Err(RagwatchError::validation(format!(
                "need at least 2 non-empty statistics to derive limits, got {}",
                populated.len()
            )));
        }

        let success: Vec<f64> = populated.iter().map(|s| s.success_rate).collect();
        let relevance: Vec<f64> = populated.iter().map(|s| s.avg_relevance_score).collect();
        let latency: Vec<f64> = populated.iter().map(|s| s.avg_latency_ms).collect();

        let (success_mean, success_std) = mean_and_std_dev(&success);
        let (relevance_mean, relevance_std) = mean_and_std_dev(&relevance);
        let (latency_mean, latency_std) = mean_and_std_dev(&latency);

        Ok(Self {
            success_rate_lower: (success_mean - sigma * success_std).clamp(0.0, 1.0),
            relevance_score_lower: (relevance_mean - sigma * relevance_std).clamp(0.0, 1.0),
            latency_upper: (latency_mean + sigma * latency_std).max(0.0),
            sigma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(success: f64, relevance: f64, latency: f64) -> RagStatistics {
        RagStatistics {
            query_count: 10,
            ..RagStatistics::from_metrics(success, relevance, latency)
        }
    }

    #[test]
    fn update_preserves_created_at() {
        let first = update_baseline(None, &snapshot(0.9, 0.8, 100.0), ControlLimits::default());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = update_baseline(
            Some(&first),
            &snapshot(0.95, 0.85, 90.0),
            ControlLimits::default(),
        );

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.success_rate, 0.95);
        assert!(second.control_limits.is_some());
    }

    #[test]
    fn limits_from_history_use_sigma() {
        let history = vec![
            snapshot(0.8, 0.6, 100.0),
            snapshot(1.0, 0.8, 300.0),
        ];
        let limits = ControlLimits::from_history(&history, 2.0).unwrap();

        // mean 0.9, std 0.1 -> 0.7
        assert!((limits.success_rate_lower - 0.7).abs() < 1e-9);
        // mean 0.7, std 0.1 -> 0.5
        assert!((limits.relevance_score_lower - 0.5).abs() < 1e-9);
        // mean 200, std 100 -> 400
        assert!((limits.latency_upper - 400.0).abs() < 1e-9);
        assert_eq!(limits.sigma, 2.0);
    }

    #[test]
    fn limits_from_history_clamp() {
        let history = vec![snapshot(0.1, 0.0, 0.0), snapshot(0.9, 1.0, 10.0)];
        let limits = ControlLimits::from_history(&history, 3.0).unwrap();
        assert_eq!(limits.success_rate_lower, 0.0);
        assert_eq!(limits.relevance_score_lower, 0.0);
        assert!(limits.latency_upper >= 0.0);
    }

    #[test]
    fn limits_from_history_need_two_snapshots() {
        let err = ControlLimits::from_history(&[snapshot(0.9, 0.8, 100.0)], 2.0).unwrap_err();
        assert!(err.is_validation());

        let with_empty = vec![snapshot(0.9, 0.8, 100.0), RagStatistics::default()];
        assert!(ControlLimits::from_history(&with_empty, 2.0).is_err());
    }

    #[test]
    fn limits_from_history_reject_bad_sigma() {
        let history = vec![snapshot(0.8, 0.6, 100.0), snapshot(1.0, 0.8, 300.0)];
        assert!(matches!(
            ControlLimits::from_history(&history, 0.0),
            Err(RagwatchError::Configuration(_))
        ));
    }
}
