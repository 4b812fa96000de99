//! Core types for query events, statistics, and drift detection.

mod drift;
mod event;
mod kinds;
mod stats;

pub use drift::{
    AlertId, ControlLimits, DriftAlert, DriftMetric, DriftResult, MetricName, RagBaseline,
};
pub use event::{Granularity, QueryEvent, TimeWindow};
pub use kinds::{ErrorKind, Severity};
pub use stats::{ErrorBreakdown, RagStatistics};
