//! ragwatch-core - Statistics and drift detection for RAG pipelines
//!
//! Query events are aggregated over time windows into [`RagStatistics`],
//! compared against a [`RagBaseline`] using [`ControlLimits`], and turned
//! into [`DriftAlert`]s when a limit is breached.

pub mod baseline;
pub mod config;
pub mod drift;
pub mod error;
pub mod log;
pub mod monitor;
pub mod stats;
pub mod types;

pub use baseline::update_baseline;
pub use config::DriftConfig;
pub use drift::DriftDetector;
pub use error::{RagwatchError, Result};
pub use log::QueryLog;
pub use monitor::DriftMonitor;
pub use stats::compute_statistics;
pub use types::*;
