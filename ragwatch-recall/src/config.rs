//! Configuration for the knowledge base and fix ranker.

use serde::{Deserialize, Serialize};

use ragwatch_core::{RagwatchError, Result};

/// Dimension of the default embedding space.
pub const DEFAULT_DIMENSION: usize = 384;

/// Knowledge base settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Every stored embedding must have exactly this many entries
    pub dimension: usize,
    /// Result count when a search does not set a limit
    pub default_search_limit: usize,
    /// Index candidates fetched per requested result, to survive date filtering
    pub overfetch_factor: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            default_search_limit: 10,
            overfetch_factor: 2,
        }
    }
}

impl KnowledgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(RagwatchError::configuration("dimension must be at least 1"));
        }
        if self.default_search_limit == 0 {
            return Err(RagwatchError::configuration(
                "default_search_limit must be at least 1",
            ));
        }
        if self.overfetch_factor == 0 {
            return Err(RagwatchError::configuration(
                "overfetch_factor must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Fix ranking settings.
///
/// The two weights are normalized to sum to 1 when the ranker is built, so
/// `3.0 / 2.0` behaves like `0.6 / 0.4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Weight of the similarity between the target and a past error
    pub similarity_weight: f64,
    /// Weight of the fix's observed success rate
    pub success_weight: f64,
    /// Past errors less similar than this are ignored
    pub min_similarity_threshold: f64,
    /// Similar errors fetched per suggestion request
    pub max_candidates: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.6,
            success_weight: 0.4,
            min_similarity_threshold: 0.3,
            max_candidates: 10,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("similarity_weight", self.similarity_weight),
            ("success_weight", self.success_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RagwatchError::configuration(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }
        if self.similarity_weight + self.success_weight <= 0.0 {
            return Err(RagwatchError::configuration(
                "similarity_weight and success_weight must not both be zero",
            ));
        }
        if !(-1.0..=1.0).contains(&self.min_similarity_threshold) {
            return Err(RagwatchError::configuration(format!(
                "min_similarity_threshold must be within [-1, 1], got {}",
                self.min_similarity_threshold
            )));
        }
        if self.max_candidates == 0 {
            return Err(RagwatchError::configuration(
                "max_candidates must be at least 1",
            ));
        }
        Ok(())
    }

    /// Copy with the weights scaled to sum to 1. Assumes `validate` passed.
    pub fn normalized(&self) -> Self {
        let total = self.similarity_weight + self.success_weight;
        Self {
            similarity_weight: self.similarity_weight / total,
            success_weight: self.success_weight / total,
            ..self.clone()
        }
    }
}
