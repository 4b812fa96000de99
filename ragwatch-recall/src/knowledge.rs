//! Vector-indexed knowledge base of past errors and their fixes
//!
//! Records are persisted to an [`ErrorStore`] first and then mirrored into a
//! [`VectorIndex`]; a record is searchable once `store_error` returns.
//! Records missing an embedding get one from the injected [`Embedder`]
//! over [`ErrorRecord::canonical_text`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use ragwatch_core::{RagwatchError, Result};

use crate::config::KnowledgeConfig;
use crate::embedder::Embedder;
use crate::index::{InMemoryVectorIndex, IndexEntry, IndexMetadata, MetadataFilter, VectorIndex};
use crate::store::{ErrorStore, InMemoryErrorStore};
use crate::types::{ErrorFilter, ErrorRecord, FixRecord, SearchQuery, SimilarError};

/// Past errors with embeddings and linked fixes.
pub struct KnowledgeBase {
    store: Arc<dyn ErrorStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    config: KnowledgeConfig,
}

impl KnowledgeBase {
    /// Build a knowledge base over the given backends.
    ///
    /// The embedder must produce vectors of the configured dimension.
    pub fn new(
        store: Arc<dyn ErrorStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        config: KnowledgeConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimensions() != config.dimension {
            return Err(RagwatchError::configuration(format!(
                "embedder produces {} dimensions but the knowledge base expects {}",
                embedder.dimensions(),
                config.dimension
            )));
        }
        Ok(Self {
            store,
            index,
            embedder,
            config,
        })
    }

    /// Knowledge base backed by the in-memory store and index.
    pub fn in_memory(embedder: Arc<dyn Embedder>, config: KnowledgeConfig) -> Result<Self> {
        Self::new(
            Arc::new(InMemoryErrorStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            embedder,
            config,
        )
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// Validate, embed if needed, persist, then index. Returns the id.
    #[instrument(skip_all, fields(id = %record.id))]
    pub async fn store_error(&self, mut record: ErrorRecord) -> Result<String> {
        record.validate()?;

        if record.embedding.is_empty() {
            record.embedding = self.embedder.embed(&record.canonical_text()).await?;
            debug!("Derived embedding from canonical text");
        }
        self.check_embedding(&record.embedding)?;

        let entry = IndexEntry {
            id: record.id.clone(),
            vector: record.embedding.clone(),
            metadata: IndexMetadata {
                kind: record.kind,
                component: record.component.clone(),
                severity: record.severity,
                timestamp: record.timestamp,
            },
        };
        let id = record.id.clone();
        let kind = record.kind;

        self.store.insert(record).await?;
        self.index.upsert(vec![entry]).await?;

        info!(%kind, "Error stored");
        Ok(id)
    }

    /// Attach a fix to an error; a fix with the same id is replaced in place.
    #[instrument(skip(self, fix), fields(fix_id = %fix.id))]
    pub async fn link_fix(&self, error_id: &str, fix: FixRecord) -> Result<()> {
        let owner = error_id.to_string();
        let record = self
            .store
            .modify(
                error_id,
                Box::new(move |record| {
                    if fix.error_id != owner {
                        return Err(RagwatchError::validation(format!(
                            "fix {} belongs to {}, not {}",
                            fix.id, fix.error_id, owner
                        )));
                    }
                    fix.validate()?;
                    match record.fixes.iter_mut().find(|f| f.id == fix.id) {
                        Some(existing) => *existing = fix,
                        None => record.fixes.push(fix),
                    }
                    Ok(())
                }),
            )
            .await?;
        debug!(fixes = record.fixes.len(), "Fix linked");
        Ok(())
    }

    /// Stored errors most similar to the query, in descending similarity.
    ///
    /// A query with neither an embedding nor non-empty text yields no
    /// results. `embedding` takes precedence over `text`.
    #[instrument(skip_all)]
    pub async fn search_similar(&self, query: &SearchQuery) -> Result<Vec<SimilarError>> {
        let embedding = match (&query.embedding, query.text.as_deref()) {
            (Some(embedding), _) => {
                self.check_embedding(embedding)?;
                embedding.clone()
            }
            (None, Some(text)) if !text.trim().is_empty() => self.embedder.embed(text).await?,
            _ => return Ok(Vec::new()),
        };

        let limit = query.limit.unwrap_or(self.config.default_search_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let filter = MetadataFilter {
            kind: query.kind,
            component: query.component.clone(),
            severity: query.severity,
        };
        let top_k = limit.saturating_mul(self.config.overfetch_factor);
        let matches = self
            .index
            .search(
                &embedding,
                top_k,
                (!filter.is_empty()).then_some(&filter),
            )
            .await?;

        let mut results = Vec::with_capacity(limit);
        for candidate in matches {
            if results.len() >= limit {
                break;
            }
            let Some(record) = self.store.get(&candidate.id).await? else {
                warn!(id = %candidate.id, "Index entry has no stored record");
                continue;
            };
            if query
                .date_range
                .is_some_and(|range| !range.contains(record.timestamp))
            {
                continue;
            }
            results.push(SimilarError {
                fixes: record.fixes.clone(),
                error: record,
                similarity: candidate.score,
            });
        }

        debug!(results = results.len(), "Similarity search complete");
        Ok(results)
    }

    pub async fn get_error(&self, id: &str) -> Result<ErrorRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| RagwatchError::not_found("error", id))
    }

    /// Fold one outcome into a fix's success rate and return the new fix.
    #[instrument(skip(self))]
    pub async fn update_fix_effectiveness(&self, fix_id: &str, resolved: bool) -> Result<FixRecord> {
        let owner = self
            .store
            .find_fix_owner(fix_id)
            .await?
            .ok_or_else(|| RagwatchError::not_found("fix", fix_id))?;

        let target = fix_id.to_string();
        let record = self
            .store
            .modify(
                &owner,
                Box::new(move |record| {
                    let fix = record
                        .fixes
                        .iter_mut()
                        .find(|f| f.id == target)
                        .ok_or_else(|| RagwatchError::not_found("fix", &target))?;
                    fix.success_rate = updated_success_rate(fix.success_rate, resolved);
                    fix.resolved = resolved;
                    Ok(())
                }),
            )
            .await?;

        let fix = record
            .fix(fix_id)
            .cloned()
            .ok_or_else(|| RagwatchError::not_found("fix", fix_id))?;
        info!(success_rate = fix.success_rate, resolved, "Fix effectiveness updated");
        Ok(fix)
    }

    /// Errors matching every condition in `filter`, newest first.
    pub async fn query_errors(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>> {
        self.store.query(filter).await
    }

    pub async fn error_count(&self) -> Result<usize> {
        Ok(self.store.list().await?.len())
    }

    pub(crate) async fn all_errors(&self) -> Result<Vec<ErrorRecord>> {
        self.store.list().await
    }

    fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.config.dimension {
            return Err(RagwatchError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }
        if let Some(pos) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(RagwatchError::validation(format!(
                "embedding entry {pos} is not a finite number"
            )));
        }
        Ok(())
    }
}

/// Success rate after one more outcome.
///
/// The current rate is read as `successes / trials` with
/// `trials = max(1, round(1 / rate))`; a rate of 0 is treated as 0.5 since
/// no trials can be implied from it. One trial is added, and one success
/// when `resolved`.
pub fn updated_success_rate(rate: f64, resolved: bool) -> f64 {
    let rate = if rate > 0.0 { rate.min(1.0) } else { 0.5 };
    let trials = (1.0 / rate).round().max(1.0);
    let successes = rate * trials + if resolved { 1.0 } else { 0.0 };
    (successes / (trials + 1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::CharCodeEmbedder;
    use crate::types::{DateRange, ErrorContext};
    use chrono::{Duration, Utc};
    use ragwatch_core::{ErrorKind, Severity};

    fn kb(dimension: usize) -> KnowledgeBase {
        KnowledgeBase::in_memory(
            Arc::new(CharCodeEmbedder::new(dimension)),
            KnowledgeConfig {
                dimension,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn record(id: &str, embedding: Vec<f32>) -> ErrorRecord {
        ErrorRecord::new(
            id,
            ErrorKind::RetrievalFailure,
            "retriever",
            Severity::High,
            ErrorContext::new("how do I reset my password?"),
        )
        .with_embedding(embedding)
    }

    #[tokio::test]
    async fn identical_vector_ranks_first() {
        let kb = kb(3);
        kb.store_error(record("x", vec![1.0, 0.0, 0.0])).await.unwrap();
        kb.store_error(record("y", vec![0.0, 1.0, 0.0])).await.unwrap();

        let results = kb
            .search_similar(&SearchQuery::by_embedding(vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error.id, "x");
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
        assert!(results[1].similarity.abs() < 1e-9);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let kb = kb(3);
        let err = kb
            .store_error(record("x", vec![1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RagwatchError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(err.is_validation());
        assert!(kb.get_error("x").await.unwrap_err().is_not_found());

        let err = kb
            .search_similar(&SearchQuery::by_embedding(vec![1.0; 4]))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn non_finite_embedding_is_rejected() {
        let kb = kb(3);
        let err = kb
            .store_error(record("x", vec![1.0, f32::NAN, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RagwatchError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_embedding_is_derived() {
        let kb = kb(32);
        kb.store_error(record("x", Vec::new())).await.unwrap();
        let stored = kb.get_error("x").await.unwrap();
        assert_eq!(stored.embedding.len(), 32);

        let results = kb
            .search_similar(&SearchQuery::by_text(stored.canonical_text()))
            .await
            .unwrap();
        assert_eq!(results[0].error.id, "x");
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let kb = kb(3);
        kb.store_error(record("x", vec![1.0, 0.0, 0.0])).await.unwrap();
        assert!(kb.search_similar(&SearchQuery::default()).await.unwrap().is_empty());
        assert!(
            kb.search_similar(&SearchQuery::by_text("  "))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn search_applies_date_range_and_limit() {
        let kb = kb(2);
        let now = Utc::now();
        for i in 0..5 {
            let r = record(&format!("e{i}"), vec![1.0, i as f32 * 0.1])
                .with_timestamp(now - Duration::days(i));
            kb.store_error(r).await.unwrap();
        }

        let query = SearchQuery {
            date_range: Some(DateRange {
                start: Some(now - Duration::days(2)),
                end: None,
            }),
            ..SearchQuery::by_embedding(vec![1.0, 0.0]).with_limit(2)
        };
        let results = kb.search_similar(&query).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.error.id.as_str()).collect();
        assert_eq!(ids, vec!["e0", "e1"]);
    }

    #[tokio::test]
    async fn date_range_draws_from_overfetched_candidates() {
        let kb = kb(2);
        let now = Utc::now();
        // e0, e1, e3 are a month old; e2, e4, e5 are recent.
        for i in 0..6 {
            let age = if matches!(i, 0 | 1 | 3) { 30 } else { 1 };
            let r = record(&format!("e{i}"), vec![1.0, i as f32 * 0.1])
                .with_timestamp(now - Duration::days(age));
            kb.store_error(r).await.unwrap();
        }
        let recent = Some(DateRange {
            start: Some(now - Duration::days(7)),
            end: None,
        });

        // limit 2 fetches e0..e3; e4 ranks fifth and is never considered.
        let query = SearchQuery {
            date_range: recent,
            ..SearchQuery::by_embedding(vec![1.0, 0.0]).with_limit(2)
        };
        let ids: Vec<_> = kb
            .search_similar(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.error.id)
            .collect();
        assert_eq!(ids, vec!["e2"]);

        let query = SearchQuery {
            date_range: recent,
            ..SearchQuery::by_embedding(vec![1.0, 0.0]).with_limit(3)
        };
        let results = kb.search_similar(&query).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.error.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e4", "e5"]);
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn large_finite_embedding_matches_itself() {
        let kb = kb(3);
        kb.store_error(record("unit", vec![0.0, 1.0, 0.0])).await.unwrap();
        kb.store_error(record("big", vec![2e19, 0.0, 0.0])).await.unwrap();

        let results = kb
            .search_similar(&SearchQuery::by_embedding(vec![2e19, 0.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(results[0].error.id, "big");
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
        assert_eq!(results[1].similarity, 0.0);
    }

    #[tokio::test]
    async fn link_fix_appends_and_replaces() {
        let kb = kb(3);
        kb.store_error(record("e1", vec![1.0, 0.0, 0.0])).await.unwrap();

        kb.link_fix("e1", FixRecord::new("f1", "e1", "raise top_k"))
            .await
            .unwrap();
        kb.link_fix("e1", FixRecord::new("f1", "e1", "raise top_k to 20"))
            .await
            .unwrap();
        kb.link_fix("e1", FixRecord::new("f2", "e1", "add reranker"))
            .await
            .unwrap();

        let stored = kb.get_error("e1").await.unwrap();
        assert_eq!(stored.fixes.len(), 2);
        assert_eq!(stored.fixes[0].description, "raise top_k to 20");
    }

    #[tokio::test]
    async fn link_fix_checks_owner() {
        let kb = kb(3);
        kb.store_error(record("e1", vec![1.0, 0.0, 0.0])).await.unwrap();

        let err = kb
            .link_fix("e1", FixRecord::new("f1", "e2", "x"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = kb
            .link_fix("missing", FixRecord::new("f1", "missing", "x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn effectiveness_moves_rate() {
        let kb = kb(3);
        kb.store_error(record("e1", vec![1.0, 0.0, 0.0])).await.unwrap();
        kb.link_fix("e1", FixRecord::new("f1", "e1", "x").with_success_rate(0.5))
            .await
            .unwrap();

        let fix = kb.update_fix_effectiveness("f1", true).await.unwrap();
        assert!((fix.success_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!(fix.resolved);

        let fix = kb.update_fix_effectiveness("f1", false).await.unwrap();
        assert!(fix.success_rate < 2.0 / 3.0);
        assert!(!fix.resolved);

        assert!(
            kb.update_fix_effectiveness("nope", true)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn success_rate_update_is_monotone() {
        for rate in [0.05, 0.2, 0.3, 0.5, 0.7, 0.9, 0.99] {
            assert!(updated_success_rate(rate, true) > rate, "rate {rate}");
            assert!(updated_success_rate(rate, false) < rate, "rate {rate}");
        }
        assert_eq!(updated_success_rate(0.0, true), 2.0 / 3.0);
        assert_eq!(updated_success_rate(1.0, true), 1.0);
    }

    #[test]
    fn embedder_dimension_must_match() {
        let result = KnowledgeBase::in_memory(
            Arc::new(CharCodeEmbedder::new(8)),
            KnowledgeConfig::default(),
        );
        assert!(matches!(result, Err(RagwatchError::Configuration(_))));
    }
}
