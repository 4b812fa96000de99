//! Shared arguments and file helpers for commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, ValueEnum};
use ragwatch_core::{Granularity, QueryEvent, TimeWindow};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Window length used when there is nothing to infer one from.
const FALLBACK_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum GranularityArg {
    Minute,
    #[default]
    Hour,
    Day,
    Week,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Minute => Granularity::Minute,
            GranularityArg::Hour => Granularity::Hour,
            GranularityArg::Day => Granularity::Day,
            GranularityArg::Week => Granularity::Week,
        }
    }
}

/// Time window selection
///
/// With neither bounds nor `--hours`, the window spans the events given.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Window length in hours, ending at --end or the latest event
    #[arg(long, conflicts_with = "start")]
    pub hours: Option<i64>,

    /// Bucket size for derived control limits
    #[arg(long, value_enum, default_value_t = GranularityArg::Hour)]
    pub granularity: GranularityArg,
}

impl WindowArgs {
    pub fn resolve(&self, events: &[QueryEvent]) -> Result<TimeWindow> {
        let granularity = self.granularity.into();
        let earliest = events.iter().map(|e| e.timestamp).min();
        let latest = events.iter().map(|e| e.timestamp).max();

        let (start, end) = match (self.start, self.end, self.hours) {
            (Some(start), Some(end), _) => (start, end),
            (_, end, Some(hours)) => {
                let end = end.or(latest).unwrap_or_else(Utc::now);
                let start = Duration::try_hours(hours)
                    .and_then(|length| end.checked_sub_signed(length))
                    .ok_or_else(|| anyhow!("--hours {hours} is out of range"))?;
                (start, end)
            }
            (start, end, None) => match (start.or(earliest), end.or(latest)) {
                (Some(start), Some(end)) if start < end => (start, end),
                (Some(start), _) => (start, start + Duration::seconds(1)),
                _ => {
                    let end = end.unwrap_or_else(Utc::now);
                    (end - Duration::hours(FALLBACK_WINDOW_HOURS), end)
                }
            },
        };

        Ok(TimeWindow::new(start, end, granularity)?)
    }
}

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pretty-print JSON to `output`, or stdout when absent
pub fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}
