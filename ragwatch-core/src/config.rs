//! Configuration for the analysis pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagwatchError, Result};
use crate::types::ControlLimits;

/// Configuration for baseline maintenance and drift detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Limits used when a baseline carries none of its own
    pub control_limits: ControlLimits,
    /// Minimum events inside a window before it may become the baseline
    pub min_events_for_baseline: usize,
    /// Derive baseline limits from per-bucket variation instead of using fixed limits
    pub derive_limits: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            control_limits: ControlLimits::default(),
            min_events_for_baseline: 10,
            derive_limits: false,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<()> {
        self.control_limits.validate()?;
        if self.min_events_for_baseline == 0 {
            return Err(RagwatchError::configuration(
                "min_events_for_baseline must be at least 1",
            ));
        }
        Ok(())
    }
}
