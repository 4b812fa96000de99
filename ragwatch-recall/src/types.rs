//! Types for the error knowledge base and fix ranking
//!
//! Error records own their fixes; suggestions reference both by value so a
//! suggestion stays meaningful after the record is updated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ragwatch_core::{ErrorKind, RagwatchError, Result, Severity};

// ============================================================================
// Error Records
// ============================================================================

/// What the pipeline saw when the error happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// The user query that triggered the error
    pub query: String,
    /// Documents the retriever returned
    #[serde(default)]
    pub retrieved_docs: Vec<String>,
    /// Pipeline steps leading up to the error
    #[serde(default)]
    pub breadcrumbs: Vec<String>,
    /// Model output, if any was produced
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
}

impl ErrorContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// A single file edit belonging to a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChange {
    pub file_path: String,
    /// e.g. "modify", "add", "delete"
    pub change_type: String,
    pub diff: String,
}

/// A fix applied to an error, with its observed effectiveness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub id: String,
    /// Id of the owning error record
    pub error_id: String,
    pub description: String,
    #[serde(default)]
    pub code_changes: Vec<CodeChange>,
    pub applied_at: DateTime<Utc>,
    /// Whether the most recent outcome resolved the error
    pub resolved: bool,
    /// Observed success rate in [0, 1]
    pub success_rate: f64,
}

impl FixRecord {
    /// Create a fix with no outcome yet (success rate 0).
    pub fn new(
        id: impl Into<String>,
        error_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            error_id: error_id.into(),
            description: description.into(),
            code_changes: Vec::new(),
            applied_at: Utc::now(),
            resolved: false,
            success_rate: 0.0,
        }
    }

    /// Set the starting success rate.
    pub fn with_success_rate(mut self, success_rate: f64) -> Self {
        self.success_rate = success_rate;
        self
    }

    pub fn with_change(mut self, change: CodeChange) -> Self {
        self.code_changes.push(change);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RagwatchError::validation("fix id must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(RagwatchError::validation(format!(
                "fix {} has an empty description",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(RagwatchError::validation(format!(
                "fix {} success_rate must be within [0, 1], got {}",
                self.id, self.success_rate
            )));
        }
        Ok(())
    }
}

/// A recorded pipeline error with its embedding and linked fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    /// Pipeline component that failed (e.g. "retriever", "reranker")
    pub component: String,
    pub severity: Severity,
    pub context: ErrorContext,
    /// Empty until the knowledge base derives or validates one
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub fixes: Vec<FixRecord>,
}

impl ErrorRecord {
    pub fn new(
        id: impl Into<String>,
        kind: ErrorKind,
        component: impl Into<String>,
        severity: Severity,
        context: ErrorContext,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            kind,
            component: component.into(),
            severity,
            context,
            embedding: Vec::new(),
            fixes: Vec::new(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Required fields only; embeddings are checked by the knowledge base.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RagwatchError::validation("error id must not be empty"));
        }
        if self.component.trim().is_empty() {
            return Err(RagwatchError::validation(format!(
                "error {} has an empty component",
                self.id
            )));
        }
        if self.context.query.trim().is_empty() {
            return Err(RagwatchError::validation(format!(
                "error {} has an empty query",
                self.id
            )));
        }
        for fix in &self.fixes {
            if fix.error_id != self.id {
                return Err(RagwatchError::validation(format!(
                    "fix {} belongs to {}, not {}",
                    fix.id, fix.error_id, self.id
                )));
            }
            fix.validate()?;
        }
        Ok(())
    }

    /// Text used to derive an embedding when none is supplied.
    ///
    /// One line per part in a fixed order; absent parts are skipped.
    pub fn canonical_text(&self) -> String {
        let mut lines = vec![
            format!("type: {}", self.kind),
            format!("component: {}", self.component),
            format!("severity: {}", self.severity),
            format!("query: {}", self.context.query),
        ];
        if let Some(output) = &self.context.output {
            lines.push(format!("output: {output}"));
        }
        if let Some(stack) = &self.context.stack_trace {
            lines.push(format!("stack: {stack}"));
        }
        if !self.context.retrieved_docs.is_empty() {
            lines.push(format!("docs: {}", self.context.retrieved_docs.join(" | ")));
        }
        lines.join("\n")
    }

    pub fn fix(&self, fix_id: &str) -> Option<&FixRecord> {
        self.fixes.iter().find(|f| f.id == fix_id)
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Inclusive timestamp range; open on either side when a bound is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| instant >= s) && self.end.is_none_or(|e| instant <= e)
    }
}

/// Attribute filter shared by store queries and index searches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorFilter {
    pub kind: Option<ErrorKind>,
    pub component: Option<String>,
    pub severity: Option<Severity>,
    pub date_range: Option<DateRange>,
    pub limit: Option<usize>,
}

impl ErrorFilter {
    pub fn kind(kind: ErrorKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// All present conditions must hold.
    pub fn matches(&self, record: &ErrorRecord) -> bool {
        self.kind.is_none_or(|k| record.kind == k)
            && self
                .component
                .as_deref()
                .is_none_or(|c| record.component == c)
            && self.severity.is_none_or(|s| record.severity == s)
            && self
                .date_range
                .is_none_or(|r| r.contains(record.timestamp))
    }
}

/// A similarity search over stored errors.
///
/// `embedding` wins over `text` when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub embedding: Option<Vec<f32>>,
    pub text: Option<String>,
    pub kind: Option<ErrorKind>,
    pub component: Option<String>,
    pub severity: Option<Severity>,
    pub date_range: Option<DateRange>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn by_embedding(embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            ..Default::default()
        }
    }

    pub fn by_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored error together with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarError {
    pub error: ErrorRecord,
    /// Cosine similarity in [-1, 1]
    pub similarity: f64,
    pub fixes: Vec<FixRecord>,
}

// ============================================================================
// Suggestions
// ============================================================================

/// Unique identifier for a fix suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuggestionId(pub Uuid);

impl SuggestionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SuggestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SuggestionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A ranked fix proposed for an incoming error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub id: SuggestionId,
    /// The stored error the fix was originally applied to
    pub original_error: ErrorRecord,
    pub suggested_fix: FixRecord,
    /// Similarity between the target and the original error
    pub similarity: f64,
    /// Blended score in [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    /// Set once an outcome is recorded
    #[serde(default)]
    pub outcome: Option<bool>,
}

/// An error for which no sufficiently similar fix existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelPattern {
    pub error_id: String,
    pub kind: ErrorKind,
    pub component: String,
    pub observed_at: DateTime<Utc>,
}

impl NovelPattern {
    pub fn from_error(error: &ErrorRecord) -> Self {
        Self {
            error_id: error.id.clone(),
            kind: error.kind,
            component: error.component.clone(),
            observed_at: Utc::now(),
        }
    }
}
