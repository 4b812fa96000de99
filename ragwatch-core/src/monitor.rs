//! Analysis pipeline: events → statistics → drift result → alert.

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::baseline::update_baseline;
use crate::config::DriftConfig;
use crate::drift::DriftDetector;
use crate::error::{RagwatchError, Result};
use crate::log::QueryLog;
use crate::types::{
    ControlLimits, DriftResult, QueryEvent, RagBaseline, RagStatistics, TimeWindow,
};

/// Owns a query log, a drift detector, and the current baseline.
pub struct DriftMonitor {
    log: QueryLog,
    detector: DriftDetector,
    baseline: RwLock<Option<RagBaseline>>,
    config: DriftConfig,
}

impl DriftMonitor {
    pub fn new(config: DriftConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            log: QueryLog::new(),
            detector: DriftDetector::new(config.control_limits)?,
            baseline: RwLock::new(None),
            config,
        })
    }

    /// Validate and log a query event.
    pub async fn record(&self, event: QueryEvent) -> Result<()> {
        self.log.log_query(event).await
    }

    pub async fn statistics(&self, window: &TimeWindow) -> RagStatistics {
        self.log.get_statistics(window).await
    }

    /// Recompute the baseline from the events inside `window`.
    ///
    /// Fails with a validation error when the window holds fewer than
    /// `min_events_for_baseline` events.
    #[instrument(skip(self))]
    pub async fn update_baseline(&self, window: &TimeWindow) -> Result<RagBaseline> {
        let statistics = self.log.get_statistics(window).await;
        if statistics.query_count < self.config.min_events_for_baseline as u64 {
            return Err(RagwatchError::validation(format!(
                "baseline needs at least {} events, window has {}",
                self.config.min_events_for_baseline, statistics.query_count
            )));
        }

        let limits = self.baseline_limits(window).await;
        let mut current = self.baseline.write().await;
        let baseline = update_baseline(current.as_ref(), &statistics, limits);
        *current = Some(baseline.clone());
        info!(events = statistics.query_count, "Baseline refreshed");
        Ok(baseline)
    }

    /// Install an externally built baseline.
    pub async fn set_baseline(&self, baseline: RagBaseline) -> Result<()> {
        if let Some(limits) = &baseline.control_limits {
            limits.validate()?;
        }
        *self.baseline.write().await = Some(baseline);
        Ok(())
    }

    pub async fn baseline(&self) -> Option<RagBaseline> {
        self.baseline.read().await.clone()
    }

    /// Check the events inside `window` against the current baseline.
    pub async fn check(&self, window: &TimeWindow) -> Result<DriftResult> {
        let baseline = self
            .baseline()
            .await
            .ok_or_else(|| RagwatchError::not_found("baseline", "current"))?;
        let statistics = self.log.get_statistics(window).await;
        Ok(self.detector.check_for_drift(&statistics, &baseline).await)
    }

    pub fn detector(&self) -> &DriftDetector {
        &self.detector
    }

    pub fn log(&self) -> &QueryLog {
        &self.log
    }

    async fn baseline_limits(&self, window: &TimeWindow) -> ControlLimits {
        let configured = self.detector.control_limits().await;
        if !self.config.derive_limits {
            return configured;
        }

        let mut history = Vec::new();
        for bucket in window.buckets() {
            history.push(self.log.get_statistics(&bucket).await);
        }
        match ControlLimits::from_history(&history, configured.sigma) {
            Ok(limits) => limits,
            Err(e) => {
                warn!(error = %e, "Falling back to configured control limits");
                configured
            }
        }
    }
}
