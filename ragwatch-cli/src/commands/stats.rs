//! Aggregate query events into rolling statistics

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ragwatch_core::{QueryEvent, compute_statistics};
use tracing::info;

use super::common::{WindowArgs, read_json, write_json};

#[derive(Args)]
pub struct StatsArgs {
    /// JSON file holding an array of query events
    #[arg(long)]
    pub events: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Write the statistics here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: StatsArgs) -> Result<()> {
    let events: Vec<QueryEvent> = read_json(&args.events)?;
    for event in &events {
        event.validate()?;
    }
    let window = args.window.resolve(&events)?;

    let statistics = compute_statistics(&events, &window);
    info!(
        events = events.len(),
        in_window = statistics.query_count,
        "Statistics computed"
    );
    write_json(&statistics, args.output.as_ref())
}
