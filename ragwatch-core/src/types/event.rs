//! Query events and the time windows they are aggregated over.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RagwatchError, Result};

use super::kinds::ErrorKind;

/// Outcome of a single RAG query, as reported by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// Relevance of the retrieved documents (0.0-1.0)
    pub relevance_score: f64,
    /// Model confidence in the answer (0.0-1.0)
    pub confidence: f64,
    pub latency_ms: f64,
    pub token_count: u64,
    /// Free-form error label; unrecognized labels aggregate as `unknown`
    #[serde(default)]
    pub error_type: Option<String>,
}

impl QueryEvent {
    /// A successful event with the given measurements.
    pub fn success(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        relevance_score: f64,
        latency_ms: f64,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            success: true,
            relevance_score,
            confidence: relevance_score,
            latency_ms,
            token_count: 0,
            error_type: None,
        }
    }

    /// A failed event carrying an error label.
    pub fn failure(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        error_type: impl Into<String>,
        latency_ms: f64,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            success: false,
            relevance_score: 0.0,
            confidence: 0.0,
            latency_ms,
            token_count: 0,
            error_type: Some(error_type.into()),
        }
    }

    /// The aggregated error kind, if this event failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if self.success {
            None
        } else {
            Some(ErrorKind::from_label(self.error_type.as_deref()))
        }
    }

    /// Check id and numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RagwatchError::validation("query event id must not be empty"));
        }
        check_unit_interval("relevance_score", self.relevance_score)?;
        check_unit_interval("confidence", self.confidence)?;
        if !self.latency_ms.is_finite() || self.latency_ms < 0.0 {
            return Err(RagwatchError::validation(format!(
                "latency_ms must be a non-negative number, got {}",
                self.latency_ms
            )));
        }
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RagwatchError::validation(format!(
            "{field} must be within [0, 1], got {value}"
        )))
    }
}

/// Bucket size used when presenting a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    #[default]
    Hour,
    Day,
    Week,
}

impl Granularity {
    pub fn step(&self) -> Duration {
        match self {
            Granularity::Minute => Duration::minutes(1),
            Granularity::Hour => Duration::hours(1),
            Granularity::Day => Duration::days(1),
            Granularity::Week => Duration::weeks(1),
        }
    }
}

/// A closed time range `[start, end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub granularity: Granularity,
}

impl TimeWindow {
    /// Create a window, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, granularity: Granularity) -> Result<Self> {
        if start >= end {
            return Err(RagwatchError::validation(format!(
                "window start {start} must be before end {end}"
            )));
        }
        Ok(Self {
            start,
            end,
            granularity,
        })
    }

    /// Inclusive on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Duration rounded to whole hours.
    pub fn duration_hours(&self) -> i64 {
        (self.duration().num_seconds() as f64 / 3600.0).round() as i64
    }

    /// Split into consecutive non-overlapping buckets of the window's granularity.
    ///
    /// Every bucket but the last ends one nanosecond before the next begins;
    /// the last bucket is truncated at `end`.
    pub fn buckets(&self) -> Vec<TimeWindow> {
        let step = self.granularity.step();
        let mut buckets = Vec::new();
        let mut start = self.start;
        while start < self.end {
            let next = start + step;
            let end = if next >= self.end {
                self.end
            } else {
                next - Duration::nanoseconds(1)
            };
            buckets.push(TimeWindow {
                start,
                end,
                granularity: self.granularity,
            });
            start = next;
        }
        buckets
    }
}
