//! Drift detection against a baseline using control limits.
//!
//! Each check compares three metrics with the baseline:
//!
//! | Metric          | Limit | Breached when                   |
//! |-----------------|-------|---------------------------------|
//! | success rate    | lower | `current < success_rate_lower`  |
//! | relevance score | lower | `current < relevance_score_lower` |
//! | latency         | upper | `current > latency_upper`       |
//!
//! A check that breaches any limit appends a [`DriftAlert`]. Alerts are only
//! ever appended or acknowledged, never removed.

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{RagwatchError, Result};
use crate::types::{
    AlertId, ControlLimits, DriftAlert, DriftMetric, DriftResult, MetricName, RagBaseline,
    RagStatistics, Severity,
};

/// Message used when no metric is breached.
pub const NO_DRIFT_MESSAGE: &str = "No significant drift detected";

/// Interval used for sigma values outside the lookup table.
pub const DEFAULT_CONFIDENCE_INTERVAL: f64 = 0.95;

struct DetectorState {
    alerts: Vec<DriftAlert>,
    limits: ControlLimits,
}

/// Compares statistics with a baseline and records alerts.
pub struct DriftDetector {
    state: RwLock<DetectorState>,
}

impl DriftDetector {
    /// Create a detector with the given default limits.
    pub fn new(limits: ControlLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self {
            state: RwLock::new(DetectorState {
                alerts: Vec::new(),
                limits,
            }),
        })
    }

    /// Compare `statistics` with `baseline`, appending an alert on drift.
    #[instrument(skip_all, fields(has_drift))]
    pub async fn check_for_drift(
        &self,
        statistics: &RagStatistics,
        baseline: &RagBaseline,
    ) -> DriftResult {
        let mut state = self.state.write().await;
        let limits = baseline.control_limits.unwrap_or(state.limits);
        let result = evaluate(statistics, baseline, &limits);
        tracing::Span::current().record("has_drift", result.has_drift);

        if result.has_drift {
            let alert = DriftAlert::new(result.clone());
            warn!(
                alert_id = %alert.id,
                severity = %result.severity,
                message = %result.message,
                "Drift detected"
            );
            state.alerts.push(alert);
        } else {
            debug!("No drift");
        }

        result
    }

    /// Alerts that have not been acknowledged, oldest first.
    pub async fn get_active_alerts(&self) -> Vec<DriftAlert> {
        let state = self.state.read().await;
        state
            .alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .cloned()
            .collect()
    }

    /// Every alert ever raised, oldest first.
    pub async fn alerts(&self) -> Vec<DriftAlert> {
        self.state.read().await.alerts.clone()
    }

    /// Acknowledge an alert.
    ///
    /// Returns `Ok(true)` when the flag flipped, `Ok(false)` when the alert
    /// was already acknowledged, and `NotFound` for an unknown id.
    pub async fn acknowledge_alert(&self, id: AlertId) -> Result<bool> {
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| RagwatchError::not_found("alert", id))?;

        if alert.acknowledged {
            return Ok(false);
        }
        alert.acknowledged = true;
        info!(alert_id = %id, "Alert acknowledged");
        Ok(true)
    }

    /// Replace the limits used for baselines without their own.
    pub async fn set_control_limits(&self, limits: ControlLimits) -> Result<()> {
        limits.validate()?;
        self.state.write().await.limits = limits;
        debug!(?limits, "Control limits replaced");
        Ok(())
    }

    pub async fn control_limits(&self) -> ControlLimits {
        self.state.read().await.limits
    }
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self {
            state: RwLock::new(DetectorState {
                alerts: Vec::new(),
                limits: ControlLimits::default(),
            }),
        }
    }
}

/// Pure drift evaluation; does not record alerts.
pub fn evaluate(
    statistics: &RagStatistics,
    baseline: &RagBaseline,
    limits: &ControlLimits,
) -> DriftResult {
    let metrics = vec![
        lower_bound_metric(
            MetricName::SuccessRate,
            baseline.success_rate,
            statistics.success_rate,
            limits.success_rate_lower,
        ),
        lower_bound_metric(
            MetricName::RelevanceScore,
            baseline.avg_relevance_score,
            statistics.avg_relevance_score,
            limits.relevance_score_lower,
        ),
        DriftMetric {
            name: MetricName::Latency,
            baseline: baseline.avg_latency_ms,
            current: statistics.avg_latency_ms,
            change_percent: change_percent(baseline.avg_latency_ms, statistics.avg_latency_ms),
            control_limit: limits.latency_upper,
            breached: statistics.avg_latency_ms > limits.latency_upper,
        },
    ];

    let has_drift = metrics.iter().any(|m| m.breached);
    let severity = severity(&metrics);
    let message = message(&metrics, statistics);

    DriftResult {
        has_drift,
        metrics,
        severity,
        confidence_interval: confidence_interval(limits.sigma),
        message,
    }
}

fn lower_bound_metric(name: MetricName, baseline: f64, current: f64, limit: f64) -> DriftMetric {
    DriftMetric {
        name,
        baseline,
        current,
        change_percent: change_percent(baseline, current),
        control_limit: limit,
        breached: current < limit,
    }
}

/// `(current - baseline) / baseline * 100`; 100 when the baseline is zero
/// and the current value is not, else 0.
pub fn change_percent(baseline: f64, current: f64) -> f64 {
    if baseline == 0.0 {
        if current != 0.0 { 100.0 } else { 0.0 }
    } else {
        (current - baseline) / baseline * 100.0
    }
}

/// Severity from the number of breaches and their mean absolute change.
pub fn severity(metrics: &[DriftMetric]) -> Severity {
    let breached: Vec<&DriftMetric> = metrics.iter().filter(|m| m.breached).collect();
    if breached.is_empty() {
        return Severity::Low;
    }

    let count = breached.len();
    let mean_change =
        breached.iter().map(|m| m.change_percent.abs()).sum::<f64>() / count as f64;

    if count >= 3 || mean_change > 50.0 {
        Severity::Critical
    } else if count >= 2 || mean_change > 30.0 {
        Severity::High
    } else if mean_change > 15.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Two-sided normal coverage for the rounded sigma.
pub fn confidence_interval(sigma: f64) -> f64 {
    match sigma.round() as i64 {
        1 => 0.6827,
        2 => 0.9545,
        3 => 0.9973,
        _ => DEFAULT_CONFIDENCE_INTERVAL,
    }
}

fn message(metrics: &[DriftMetric], statistics: &RagStatistics) -> String {
    let clauses: Vec<String> = metrics
        .iter()
        .filter(|m| m.breached)
        .map(|m| {
            let direction = if m.change_percent > 0.0 {
                "increased"
            } else {
                "dropped"
            };
            format!(
                "{} {} {:.1}%",
                m.name.label(),
                direction,
                m.change_percent.abs()
            )
        })
        .collect();

    if clauses.is_empty() {
        return NO_DRIFT_MESSAGE.to_string();
    }

    let suffix = match &statistics.window {
        Some(window) => format!("over the last {} hours", window.duration_hours()),
        None => "recently".to_string(),
    };
    format!("{} {}", clauses.join(", "), suffix)
}
