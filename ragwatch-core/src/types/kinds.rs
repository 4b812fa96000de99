//! Closed enumerations shared by the analysis and recall pipelines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagwatchError;

/// Category of a failed RAG query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Retriever returned nothing or failed outright
    RetrievalFailure,
    /// Retrieved documents were not relevant to the query
    LowRelevance,
    /// Generated output was not grounded in the retrieved context
    Hallucination,
    /// A pipeline stage exceeded its deadline
    Timeout,
    /// Retrieved context exceeded the model window
    ContextOverflow,
    /// Query or document embedding failed
    EmbeddingFailure,
    /// Anything not covered above
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::RetrievalFailure,
        ErrorKind::LowRelevance,
        ErrorKind::Hallucination,
        ErrorKind::Timeout,
        ErrorKind::ContextOverflow,
        ErrorKind::EmbeddingFailure,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RetrievalFailure => "retrieval_failure",
            ErrorKind::LowRelevance => "low_relevance",
            ErrorKind::Hallucination => "hallucination",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ContextOverflow => "context_overflow",
            ErrorKind::EmbeddingFailure => "embedding_failure",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Map a free-form label to a kind; unrecognized or missing labels are `Unknown`.
    pub fn from_label(label: Option<&str>) -> Self {
        label
            .and_then(|l| l.parse().ok())
            .unwrap_or(ErrorKind::Unknown)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = RagwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| RagwatchError::validation(format!("unknown error kind: {s}")))
    }
}

/// Severity of an error record or a drift result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RagwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(RagwatchError::validation(format!("unknown severity: {other}"))),
        }
    }
}
