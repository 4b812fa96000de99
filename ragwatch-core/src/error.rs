//! Error types for ragwatch

use thiserror::Error;

/// Error type shared by the statistics, drift, and recall components
#[derive(Debug, Error)]
pub enum RagwatchError {
    /// A required field is missing or a value is out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// An embedding does not have the configured dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An error, fix, suggestion, alert, or baseline does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Weights, thresholds, or limits are out of range
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The injected embedder failed
    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl RagwatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for caller-input errors, including dimension mismatches
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DimensionMismatch { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for ragwatch operations
pub type Result<T> = std::result::Result<T, RagwatchError>;
