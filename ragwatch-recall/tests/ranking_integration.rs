//! Integration tests for the recall pipeline
//!
//! error → similarity search → candidate fixes → ranked suggestions, plus
//! outcome feedback flowing back into the knowledge base.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragwatch_core::{ErrorKind, Result, Severity};
use ragwatch_recall::{
    CharCodeEmbedder, ErrorContext, ErrorRecord, FixRanker, FixRecord, KnowledgeBase,
    KnowledgeConfig, NovelPattern, NoveltyObserver, RankerConfig, SearchQuery,
};

fn knowledge() -> Arc<KnowledgeBase> {
    Arc::new(
        KnowledgeBase::in_memory(
            Arc::new(CharCodeEmbedder::new(3)),
            KnowledgeConfig {
                dimension: 3,
                ..Default::default()
            },
        )
        .unwrap(),
    )
}

/// Unit vector whose cosine with [1, 0, 0] is `similarity`.
fn at_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt(), 0.0]
}

fn error(id: &str, kind: ErrorKind, embedding: Vec<f32>) -> ErrorRecord {
    ErrorRecord::new(
        id,
        kind,
        "retriever",
        Severity::Medium,
        ErrorContext::new("which plan includes SSO?"),
    )
    .with_embedding(embedding)
}

async fn seed(kb: &KnowledgeBase, id: &str, similarity: f32, success_rate: f64) {
    kb.store_error(error(id, ErrorKind::LowRelevance, at_similarity(similarity)))
        .await
        .unwrap();
    kb.link_fix(
        id,
        FixRecord::new(format!("{id}-fix"), id, format!("fix for {id}")).with_success_rate(success_rate),
    )
    .await
    .unwrap();
}

fn target() -> ErrorRecord {
    error("target", ErrorKind::LowRelevance, vec![1.0, 0.0, 0.0])
}

#[derive(Default)]
struct CountingObserver {
    seen: AtomicUsize,
}

#[async_trait]
impl NoveltyObserver for CountingObserver {
    async fn on_novel_pattern(&self, _pattern: &NovelPattern) -> Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn equal_scores_prefer_higher_success_rate() {
    let kb = knowledge();
    // 0.6 * 0.9 + 0.4 * 0.5 == 0.6 * 0.7 + 0.4 * 0.8 == 0.74
    seed(&kb, "a", 0.9, 0.5).await;
    seed(&kb, "b", 0.7, 0.8).await;

    let ranker = FixRanker::new(kb, RankerConfig::default()).unwrap();
    let suggestions = ranker.suggest_fixes(&target()).await.unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].suggested_fix.id, "b-fix");
    assert_eq!(suggestions[1].suggested_fix.id, "a-fix");
    assert!((suggestions[0].confidence - 0.74).abs() < 1e-3);
}

#[tokio::test]
async fn ranking_is_monotone_in_similarity_and_success() {
    let kb = knowledge();
    seed(&kb, "close-weak", 0.95, 0.2).await;
    seed(&kb, "close-strong", 0.95, 0.9).await;
    seed(&kb, "far-strong", 0.4, 0.9).await;

    let ranker = FixRanker::new(kb, RankerConfig::default()).unwrap();
    let suggestions = ranker.suggest_fixes(&target()).await.unwrap();
    let ids: Vec<_> = suggestions
        .iter()
        .map(|s| s.suggested_fix.id.as_str())
        .collect();

    assert_eq!(ids, vec!["close-strong-fix", "close-weak-fix", "far-strong-fix"]);
    for pair in suggestions.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence - 1e-3);
    }
    assert!(suggestions.iter().all(|s| (0.0..=1.0).contains(&s.confidence)));
}

#[tokio::test]
async fn weights_are_normalized() {
    let kb = knowledge();
    seed(&kb, "a", 0.9, 0.5).await;

    let ranker = FixRanker::new(
        kb,
        RankerConfig {
            similarity_weight: 3.0,
            success_weight: 2.0,
            ..Default::default()
        },
    )
    .unwrap();
    let suggestions = ranker.suggest_fixes(&target()).await.unwrap();
    assert!((suggestions[0].confidence - 0.74).abs() < 1e-3);
}

#[tokio::test]
async fn other_kinds_and_dissimilar_errors_are_ignored() {
    let kb = knowledge();
    seed(&kb, "weak-match", 0.2, 1.0).await;
    kb.store_error(error("timeout", ErrorKind::Timeout, vec![1.0, 0.0, 0.0]))
        .await
        .unwrap();
    kb.link_fix("timeout", FixRecord::new("timeout-fix", "timeout", "raise timeout"))
        .await
        .unwrap();

    let observer = Arc::new(CountingObserver::default());
    let ranker = FixRanker::new(kb, RankerConfig::default())
        .unwrap()
        .with_observer(observer.clone());

    let suggestions = ranker.suggest_fixes(&target()).await.unwrap();

    assert!(suggestions.is_empty());
    assert_eq!(observer.seen.load(Ordering::SeqCst), 1);
    let novel = ranker.novel_patterns().await;
    assert_eq!(novel.len(), 1);
    assert_eq!(novel[0].error_id, "target");
    assert_eq!(novel[0].kind, ErrorKind::LowRelevance);
}

#[tokio::test]
async fn outcome_feedback_updates_fix() {
    let kb = knowledge();
    seed(&kb, "a", 0.9, 0.5).await;

    let ranker = FixRanker::new(kb.clone(), RankerConfig::default()).unwrap();
    let suggestion = ranker.suggest_fixes(&target()).await.unwrap().remove(0);
    assert_eq!(ranker.pending_suggestions().await.len(), 1);

    let fix = ranker.record_outcome(suggestion.id, true).await.unwrap();
    assert!(fix.success_rate > 0.5);
    assert!(fix.resolved);

    let stored = kb.get_error("a").await.unwrap();
    assert_eq!(stored.fixes[0].success_rate, fix.success_rate);
    assert!(ranker.pending_suggestions().await.is_empty());
    assert_eq!(
        ranker.suggestion(suggestion.id).await.unwrap().outcome,
        Some(true)
    );

    let again = ranker.record_outcome(suggestion.id, false).await.unwrap_err();
    assert!(again.is_validation());
}

#[tokio::test]
async fn failed_outcome_lowers_rate() {
    let kb = knowledge();
    seed(&kb, "a", 0.9, 0.5).await;

    let ranker = FixRanker::new(kb, RankerConfig::default()).unwrap();
    let suggestion = ranker.suggest_fixes(&target()).await.unwrap().remove(0);
    let fix = ranker.record_outcome(suggestion.id, false).await.unwrap();
    assert!(fix.success_rate < 0.5);
    assert!(!fix.resolved);
}

#[tokio::test]
async fn unknown_suggestion_is_not_found() {
    let ranker = FixRanker::new(knowledge(), RankerConfig::default()).unwrap();
    let err = ranker
        .record_outcome(ragwatch_recall::SuggestionId::new(), true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn reset_clears_state() {
    let kb = knowledge();
    seed(&kb, "a", 0.9, 0.5).await;

    let ranker = FixRanker::new(kb, RankerConfig::default()).unwrap();
    ranker.suggest_fixes(&target()).await.unwrap();
    ranker
        .suggest_fixes(&error("novel", ErrorKind::Hallucination, vec![0.0, 0.0, 1.0]))
        .await
        .unwrap();
    assert_eq!(ranker.novel_patterns().await.len(), 1);

    ranker.reset().await;
    assert!(ranker.pending_suggestions().await.is_empty());
    assert!(ranker.novel_patterns().await.is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let result = FixRanker::new(
        knowledge(),
        RankerConfig {
            similarity_weight: -1.0,
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn text_targets_use_canonical_text() {
    let kb = Arc::new(
        KnowledgeBase::in_memory(Arc::new(CharCodeEmbedder::default()), KnowledgeConfig::default())
            .unwrap(),
    );
    let stored = ErrorRecord::new(
        "past",
        ErrorKind::Timeout,
        "vector-store",
        Severity::High,
        ErrorContext::new("search timed out after 30s"),
    );
    kb.store_error(stored).await.unwrap();
    kb.link_fix("past", FixRecord::new("past-fix", "past", "add index on embeddings").with_success_rate(0.8))
        .await
        .unwrap();

    let incoming = ErrorRecord::new(
        "incoming",
        ErrorKind::Timeout,
        "vector-store",
        Severity::High,
        ErrorContext::new("search timed out after 31s"),
    );
    let ranker = FixRanker::new(kb.clone(), RankerConfig::default()).unwrap();
    let suggestions = ranker.suggest_fixes(&incoming).await.unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].original_error.id, "past");
    assert!(suggestions[0].reasoning.contains("vector-store"));

    let similar = kb
        .search_similar(&SearchQuery::by_text(incoming.canonical_text()))
        .await
        .unwrap();
    assert!(similar[0].similarity > 0.9);
}
