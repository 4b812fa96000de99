//! Check a window of query events against a baseline

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ragwatch_core::{DriftMonitor, QueryEvent, RagBaseline};
use tracing::{info, warn};

use super::common::{WindowArgs, read_json, write_json};
use crate::config::RagwatchConfig;

#[derive(Args)]
pub struct DriftArgs {
    /// JSON file holding an array of query events
    #[arg(long)]
    pub events: PathBuf,

    /// Baseline JSON, as written by `ragwatch baseline`
    #[arg(long)]
    pub baseline: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Exit with an error when drift is detected
    #[arg(long)]
    pub fail_on_drift: bool,

    /// Write the drift result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: DriftArgs, config: &RagwatchConfig) -> Result<()> {
    let events: Vec<QueryEvent> = read_json(&args.events)?;
    let baseline: RagBaseline = read_json(&args.baseline)?;
    let window = args.window.resolve(&events)?;

    let monitor = DriftMonitor::new(config.drift.clone())?;
    monitor.set_baseline(baseline).await?;
    for event in events {
        monitor.record(event).await?;
    }

    let result = monitor.check(&window).await?;
    write_json(&result, args.output.as_ref())?;

    if result.has_drift {
        warn!(severity = %result.severity, "{}", result.message);
        if args.fail_on_drift {
            anyhow::bail!("Drift detected: {}", result.message);
        }
    } else {
        info!("{}", result.message);
    }
    Ok(())
}
