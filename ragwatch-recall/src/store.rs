//! Error record storage
//!
//! The store is the single owner of error records and their fixes. All
//! read-modify-write cycles go through [`ErrorStore::modify`], which applies
//! the change under the store's write lock and commits only on success.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use ragwatch_core::{RagwatchError, Result};

use crate::types::{ErrorFilter, ErrorRecord};

/// A mutation applied by [`ErrorStore::modify`]
pub type RecordUpdate = Box<dyn FnOnce(&mut ErrorRecord) -> Result<()> + Send>;

/// Storage interface for error records
#[async_trait]
pub trait ErrorStore: Send + Sync {
    /// Insert a new record; an existing id is a validation error
    async fn insert(&self, record: ErrorRecord) -> Result<()>;

    /// Get a record by id
    async fn get(&self, id: &str) -> Result<Option<ErrorRecord>>;

    /// Replace an existing record
    async fn update(&self, record: ErrorRecord) -> Result<()>;

    /// Atomically apply `update` to a record and return the new version
    ///
    /// The stored record is untouched when `update` fails.
    async fn modify(&self, id: &str, update: RecordUpdate) -> Result<ErrorRecord>;

    /// Records matching `filter`, newest first, truncated to its limit
    async fn query(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>>;

    /// Every record, in no particular order
    async fn list(&self) -> Result<Vec<ErrorRecord>>;

    /// Id of the record owning `fix_id`
    async fn find_fix_owner(&self, fix_id: &str) -> Result<Option<String>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|r| r.fix(fix_id).is_some())
            .map(|r| r.id))
    }
}

/// In-memory store behind a single `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryErrorStore {
    records: RwLock<HashMap<String, ErrorRecord>>,
}

impl InMemoryErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ErrorStore for InMemoryErrorStore {
    async fn insert(&self, record: ErrorRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(RagwatchError::validation(format!(
                "error {} already exists",
                record.id
            )));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ErrorRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(&self, record: ErrorRecord) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RagwatchError::not_found("error", &record.id)),
        }
    }

    async fn modify(&self, id: &str, update: RecordUpdate) -> Result<ErrorRecord> {
        let mut records = self.records.write().await;
        let existing = records
            .get_mut(id)
            .ok_or_else(|| RagwatchError::not_found("error", id))?;

        let mut draft = existing.clone();
        update(&mut draft)?;
        *existing = draft.clone();
        Ok(draft)
    }

    async fn query(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<ErrorRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn list(&self) -> Result<Vec<ErrorRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn find_fix_owner(&self, fix_id: &str) -> Result<Option<String>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.fix(fix_id).is_some())
            .map(|r| r.id.clone()))
    }
}
