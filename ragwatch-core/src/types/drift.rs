//! Baseline, control limit, and drift result types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagwatchError, Result};

use super::kinds::Severity;

/// Thresholds beyond which a monitored metric counts as breached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    /// Success rate below this value is a breach
    pub success_rate_lower: f64,
    /// Mean relevance below this value is a breach
    pub relevance_score_lower: f64,
    /// Mean latency above this value (ms) is a breach
    pub latency_upper: f64,
    /// Width of the limits in standard deviations (1, 2, or 3 recommended)
    pub sigma: f64,
}

impl Default for ControlLimits {
    fn default() -> Self {
        Self {
            success_rate_lower: 0.9,
            relevance_score_lower: 0.7,
            latency_upper: 1000.0,
            sigma: 2.0,
        }
    }
}

impl ControlLimits {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("success_rate_lower", self.success_rate_lower),
            ("relevance_score_lower", self.relevance_score_lower),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RagwatchError::configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !self.latency_upper.is_finite() || self.latency_upper < 0.0 {
            return Err(RagwatchError::configuration(format!(
                "latency_upper must be a non-negative number, got {}",
                self.latency_upper
            )));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(RagwatchError::configuration(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Expected-normal metric values plus the limits used to judge drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagBaseline {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub success_rate: f64,
    pub avg_relevance_score: f64,
    pub avg_latency_ms: f64,
    /// Limits specific to this baseline; the detector's defaults apply when absent
    #[serde(default)]
    pub control_limits: Option<ControlLimits>,
}

/// The three metrics watched for drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    SuccessRate,
    RelevanceScore,
    Latency,
}

impl MetricName {
    /// Human-readable label used in drift messages.
    pub fn label(&self) -> &'static str {
        match self {
            MetricName::SuccessRate => "success rate",
            MetricName::RelevanceScore => "retrieval relevance",
            MetricName::Latency => "latency",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Comparison of one metric against its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftMetric {
    pub name: MetricName,
    pub baseline: f64,
    pub current: f64,
    pub change_percent: f64,
    pub control_limit: f64,
    pub breached: bool,
}

/// Outcome of a drift check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub has_drift: bool,
    pub metrics: Vec<DriftMetric>,
    pub severity: Severity,
    pub confidence_interval: f64,
    pub message: String,
}

impl DriftResult {
    pub fn breached_metrics(&self) -> impl Iterator<Item = &DriftMetric> {
        self.metrics.iter().filter(|m| m.breached)
    }

    pub fn metric(&self, name: MetricName) -> Option<&DriftMetric> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

/// Unique identifier for a drift alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub Uuid);

impl AlertId {
    /// Create a new alert ID with a UUIDv7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlertId {
    type Err = RagwatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| RagwatchError::validation(format!("invalid alert id {s}: {e}")))
    }
}

/// A recorded drift, pending acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    pub id: AlertId,
    pub timestamp: DateTime<Utc>,
    pub result: DriftResult,
    pub acknowledged: bool,
}

impl DriftAlert {
    pub fn new(result: DriftResult) -> Self {
        Self {
            id: AlertId::new(),
            timestamp: Utc::now(),
            result,
            acknowledged: false,
        }
    }
}
