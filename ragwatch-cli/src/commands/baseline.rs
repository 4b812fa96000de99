//! Build a baseline from a window of query events

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ragwatch_core::{DriftMonitor, QueryEvent};
use tracing::info;

use super::common::{WindowArgs, read_json, write_json};
use crate::config::RagwatchConfig;

#[derive(Args)]
pub struct BaselineArgs {
    /// JSON file holding an array of query events
    #[arg(long)]
    pub events: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Write the baseline here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: BaselineArgs, config: &RagwatchConfig) -> Result<()> {
    let events: Vec<QueryEvent> = read_json(&args.events)?;
    let window = args.window.resolve(&events)?;

    let monitor = DriftMonitor::new(config.drift.clone())?;
    for event in events {
        monitor.record(event).await?;
    }

    let baseline = monitor
        .update_baseline(&window)
        .await
        .context("Failed to build baseline")?;
    info!(
        success_rate = baseline.success_rate,
        latency_ms = baseline.avg_latency_ms,
        "Baseline built"
    );
    write_json(&baseline, args.output.as_ref())
}
