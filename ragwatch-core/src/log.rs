//! In-memory query event log.
//!
//! Events are validated on the way in and never modified afterwards.

use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{RagwatchError, Result};
use crate::stats::compute_statistics;
use crate::types::{QueryEvent, RagStatistics, TimeWindow};

#[derive(Default)]
struct LogState {
    events: Vec<QueryEvent>,
    ids: HashSet<String>,
}

/// Append-only store of query events.
#[derive(Default)]
pub struct QueryLog {
    state: RwLock<LogState>,
}

impl QueryLog {
    /// Create a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an event; ids must be unique.
    #[instrument(skip(self, event), fields(id = %event.id))]
    pub async fn log_query(&self, event: QueryEvent) -> Result<()> {
        event.validate()?;
        let mut state = self.state.write().await;
        if !state.ids.insert(event.id.clone()) {
            return Err(RagwatchError::validation(format!(
                "duplicate query event id: {}",
                event.id
            )));
        }
        state.events.push(event);
        debug!(total = state.events.len(), "Query logged");
        Ok(())
    }

    /// Statistics over the logged events inside `window`.
    pub async fn get_statistics(&self, window: &TimeWindow) -> RagStatistics {
        let state = self.state.read().await;
        compute_statistics(&state.events, window)
    }

    /// Logged events inside `window`, in logging order.
    pub async fn events_in(&self, window: &TimeWindow) -> Vec<QueryEvent> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .filter(|e| window.contains(e.timestamp))
            .cloned()
            .collect()
    }

    /// Get the number of events in the log.
    pub async fn len(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Check if the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.events.is_empty()
    }
}
