//! Aggregated statistics types.

use serde::{Deserialize, Serialize};

use super::event::TimeWindow;
use super::kinds::ErrorKind;

/// Failure counts per error kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBreakdown {
    pub retrieval_failure: u64,
    pub low_relevance: u64,
    pub hallucination: u64,
    pub timeout: u64,
    pub context_overflow: u64,
    pub embedding_failure: u64,
    pub unknown: u64,
}

impl ErrorBreakdown {
    /// Increment the count for a given kind.
    pub fn increment(&mut self, kind: ErrorKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: ErrorKind) -> u64 {
        match kind {
            ErrorKind::RetrievalFailure => self.retrieval_failure,
            ErrorKind::LowRelevance => self.low_relevance,
            ErrorKind::Hallucination => self.hallucination,
            ErrorKind::Timeout => self.timeout,
            ErrorKind::ContextOverflow => self.context_overflow,
            ErrorKind::EmbeddingFailure => self.embedding_failure,
            ErrorKind::Unknown => self.unknown,
        }
    }

    /// Total count across all kinds.
    pub fn total(&self) -> u64 {
        ErrorKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }

    /// Kinds with a non-zero count, most frequent first.
    pub fn top(&self) -> Vec<(ErrorKind, u64)> {
        let mut counts: Vec<_> = ErrorKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|(_, count)| *count > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    fn slot(&mut self, kind: ErrorKind) -> &mut u64 {
        match kind {
            ErrorKind::RetrievalFailure => &mut self.retrieval_failure,
            ErrorKind::LowRelevance => &mut self.low_relevance,
            ErrorKind::Hallucination => &mut self.hallucination,
            ErrorKind::Timeout => &mut self.timeout,
            ErrorKind::ContextOverflow => &mut self.context_overflow,
            ErrorKind::EmbeddingFailure => &mut self.embedding_failure,
            ErrorKind::Unknown => &mut self.unknown,
        }
    }
}

/// Rolling metrics over a window of query events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagStatistics {
    /// The window these statistics cover, when known
    #[serde(default)]
    pub window: Option<TimeWindow>,
    pub query_count: u64,
    /// Fraction of successful queries (0.0-1.0)
    pub success_rate: f64,
    /// Mean relevance score (0.0-1.0)
    pub avg_relevance_score: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    #[serde(default)]
    pub error_breakdown: ErrorBreakdown,
}

impl RagStatistics {
    /// Statistics carrying only the three drift-monitored metrics.
    pub fn from_metrics(success_rate: f64, avg_relevance_score: f64, avg_latency_ms: f64) -> Self {
        Self {
            success_rate,
            avg_relevance_score,
            avg_latency_ms,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query_count == 0
    }
}
