//! Fix ranking for incoming errors
//!
//! For a target error the ranker finds similar past errors of the same kind,
//! flattens their fixes, and scores each one as
//!
//! ```text
//! score = similarity_weight * similarity + success_weight * success_rate
//! ```
//!
//! with the weights normalized to sum to 1. Scores within 0.001 of each
//! other count as tied and are ordered by success rate instead. Targets with
//! no usable candidates are recorded as novel patterns.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use ragwatch_core::{RagwatchError, Result};

use crate::config::RankerConfig;
use crate::knowledge::KnowledgeBase;
use crate::types::{
    ErrorRecord, FixRecord, FixSuggestion, NovelPattern, SearchQuery, SuggestionId,
};

/// Scores closer than this are ordered by success rate.
pub const TIE_EPSILON: f64 = 0.001;

/// Receives errors for which no known fix applies
#[async_trait]
pub trait NoveltyObserver: Send + Sync {
    async fn on_novel_pattern(&self, pattern: &NovelPattern) -> Result<()>;
}

/// Observer that only logs.
#[derive(Debug, Default)]
pub struct LoggingNoveltyObserver;

#[async_trait]
impl NoveltyObserver for LoggingNoveltyObserver {
    async fn on_novel_pattern(&self, pattern: &NovelPattern) -> Result<()> {
        info!(
            error_id = %pattern.error_id,
            kind = %pattern.kind,
            component = %pattern.component,
            "Novel error pattern"
        );
        Ok(())
    }
}

#[derive(Default)]
struct RankerState {
    suggestions: BTreeMap<SuggestionId, FixSuggestion>,
    novel_patterns: Vec<NovelPattern>,
}

struct Candidate {
    score: f64,
    similarity: f64,
    fix: FixRecord,
    error: ErrorRecord,
}

/// Ranks fixes from the knowledge base and tracks their outcomes.
pub struct FixRanker {
    knowledge: Arc<KnowledgeBase>,
    config: RankerConfig,
    observer: Option<Arc<dyn NoveltyObserver>>,
    state: RwLock<RankerState>,
}

impl FixRanker {
    pub fn new(knowledge: Arc<KnowledgeBase>, config: RankerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            knowledge,
            config: config.normalized(),
            observer: None,
            state: RwLock::new(RankerState::default()),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn NoveltyObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Normalized configuration in use.
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Ranked suggestions for `target`, best first.
    ///
    /// An empty result means the pattern is novel; it is recorded and the
    /// observer notified, but it is not an error.
    #[instrument(skip_all, fields(target = %target.id, kind = %target.kind))]
    pub async fn suggest_fixes(&self, target: &ErrorRecord) -> Result<Vec<FixSuggestion>> {
        let query = if target.embedding.is_empty() {
            SearchQuery::by_text(target.canonical_text())
        } else {
            SearchQuery::by_embedding(target.embedding.clone())
        }
        .with_kind(target.kind)
        .with_limit(self.config.max_candidates);

        let similar = self.knowledge.search_similar(&query).await?;

        let mut candidates: Vec<Candidate> = similar
            .into_iter()
            .filter(|s| s.similarity >= self.config.min_similarity_threshold)
            .flat_map(|s| {
                let similarity = s.similarity;
                let error = s.error;
                s.fixes.into_iter().map(move |fix| Candidate {
                    score: self.score(similarity, fix.success_rate),
                    similarity,
                    fix,
                    error: error.clone(),
                })
            })
            .collect();

        if candidates.is_empty() {
            self.record_novel(target).await;
            return Ok(Vec::new());
        }

        rank(&mut candidates);

        let now = Utc::now();
        let suggestions: Vec<FixSuggestion> = candidates
            .into_iter()
            .map(|c| FixSuggestion {
                id: SuggestionId::new(),
                reasoning: reasoning(&c),
                confidence: c.score.clamp(0.0, 1.0),
                similarity: c.similarity,
                original_error: c.error,
                suggested_fix: c.fix,
                created_at: now,
                outcome: None,
            })
            .collect();

        let mut state = self.state.write().await;
        for suggestion in &suggestions {
            state.suggestions.insert(suggestion.id, suggestion.clone());
        }
        drop(state);

        info!(count = suggestions.len(), "Fix suggestions ranked");
        Ok(suggestions)
    }

    /// Record whether a suggestion resolved the error.
    ///
    /// Each suggestion takes one outcome; a second one is a validation
    /// error. Returns the fix with its updated success rate.
    #[instrument(skip(self))]
    pub async fn record_outcome(&self, id: SuggestionId, resolved: bool) -> Result<FixRecord> {
        let fix_id = {
            let mut state = self.state.write().await;
            let suggestion = state
                .suggestions
                .get_mut(&id)
                .ok_or_else(|| RagwatchError::not_found("suggestion", id))?;
            if suggestion.outcome.is_some() {
                return Err(RagwatchError::validation(format!(
                    "outcome for suggestion {id} was already recorded"
                )));
            }
            suggestion.outcome = Some(resolved);
            suggestion.suggested_fix.id.clone()
        };

        match self
            .knowledge
            .update_fix_effectiveness(&fix_id, resolved)
            .await
        {
            Ok(fix) => {
                if let Some(suggestion) = self.state.write().await.suggestions.get_mut(&id) {
                    suggestion.suggested_fix = fix.clone();
                }
                Ok(fix)
            }
            Err(e) => {
                if let Some(suggestion) = self.state.write().await.suggestions.get_mut(&id) {
                    suggestion.outcome = None;
                }
                Err(e)
            }
        }
    }

    pub async fn suggestion(&self, id: SuggestionId) -> Option<FixSuggestion> {
        self.state.read().await.suggestions.get(&id).cloned()
    }

    /// Suggestions still waiting for an outcome, oldest first.
    pub async fn pending_suggestions(&self) -> Vec<FixSuggestion> {
        self.state
            .read()
            .await
            .suggestions
            .values()
            .filter(|s| s.outcome.is_none())
            .cloned()
            .collect()
    }

    pub async fn novel_patterns(&self) -> Vec<NovelPattern> {
        self.state.read().await.novel_patterns.clone()
    }

    /// Forget all suggestions and novel patterns.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.suggestions.clear();
        state.novel_patterns.clear();
        debug!("Ranker state cleared");
    }

    fn score(&self, similarity: f64, success_rate: f64) -> f64 {
        self.config.similarity_weight * similarity + self.config.success_weight * success_rate
    }

    async fn record_novel(&self, target: &ErrorRecord) {
        let pattern = NovelPattern::from_error(target);
        self.state.write().await.novel_patterns.push(pattern.clone());

        if let Some(observer) = &self.observer
            && let Err(e) = observer.on_novel_pattern(&pattern).await
        {
            warn!(error = %e, "Novelty observer failed");
        }
        debug!("No similar fixes; recorded novel pattern");
    }
}

/// Sort by score descending, then reorder near-tied runs by success rate.
///
/// A run holds every candidate within `TIE_EPSILON` of its first (highest)
/// score, so ties do not chain across a wider spread.
fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut start = 0;
    while start < candidates.len() {
        let mut end = start + 1;
        while end < candidates.len()
            && candidates[start].score - candidates[end].score < TIE_EPSILON
        {
            end += 1;
        }
        candidates[start..end]
            .sort_by(|a, b| b.fix.success_rate.total_cmp(&a.fix.success_rate));
        start = end;
    }
}

fn reasoning(candidate: &Candidate) -> String {
    format!(
        "Similar {} error in {} ({:.0}% similar); fix has a {:.0}% success rate",
        candidate.error.kind,
        candidate.error.component,
        candidate.similarity * 100.0,
        candidate.fix.success_rate * 100.0
    )
}
