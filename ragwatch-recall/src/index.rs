//! Vector index over error embeddings
//!
//! The index holds a derived copy of each stored embedding plus the
//! metadata needed to pre-filter searches. The knowledge base stays the
//! owner of the records themselves.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use ragwatch_core::{ErrorKind, Result, Severity};

use crate::embedder::cosine_similarity;

/// Attributes stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub kind: ErrorKind,
    pub component: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: IndexMetadata,
}

/// Equality filter on index metadata; absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    pub kind: Option<ErrorKind>,
    pub component: Option<String>,
    pub severity: Option<Severity>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.component.is_none() && self.severity.is_none()
    }

    pub fn matches(&self, metadata: &IndexMetadata) -> bool {
        self.kind.is_none_or(|k| metadata.kind == k)
            && self
                .component
                .as_deref()
                .is_none_or(|c| metadata.component == c)
            && self.severity.is_none_or(|s| metadata.severity == s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    /// Cosine similarity with the query vector
    pub score: f64,
}

/// Storage interface for embedding vectors
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries by id
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Top `top_k` matches by descending score, ties broken by ascending id
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>>;

    /// Remove entries; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Entries for the given ids, skipping unknown ones
    async fn fetch(&self, ids: &[String]) -> Result<Vec<IndexEntry>>;
}

/// Brute-force in-memory index.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<HashMap<String, IndexEntry>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut map = self.entries.write().await;
        for entry in entries {
            map.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let map = self.entries.read().await;
        let mut matches: Vec<IndexMatch> = map
            .values()
            .filter(|e| filter.is_none_or(|f| f.matches(&e.metadata)))
            .map(|e| IndexMatch {
                id: e.id.clone(),
                score: cosine_similarity(vector, &e.vector),
            })
            .collect();

        matches.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut map = self.entries.write().await;
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<IndexEntry>> {
        let map = self.entries.read().await;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }
}
