//! Rank known fixes for an incoming error

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use ragwatch_recall::{
    CharCodeEmbedder, ErrorRecord, FixRanker, KnowledgeBase, KnowledgeExport,
    LoggingNoveltyObserver,
};
use tracing::{info, warn};

use super::common::{read_json, write_json};
use crate::config::RagwatchConfig;

#[derive(Args)]
pub struct SuggestArgs {
    /// Knowledge export JSON holding past errors and their fixes
    #[arg(long)]
    pub knowledge: PathBuf,

    /// JSON file holding the error to find fixes for
    #[arg(long)]
    pub error: PathBuf,

    /// Show at most this many suggestions
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Write the suggestions here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: SuggestArgs, config: &RagwatchConfig) -> Result<()> {
    let export: KnowledgeExport = read_json(&args.knowledge)?;
    let target: ErrorRecord = read_json(&args.error)?;
    target.validate()?;

    let embedder = Arc::new(CharCodeEmbedder::new(config.knowledge.dimension));
    let knowledge = Arc::new(KnowledgeBase::in_memory(embedder, config.knowledge.clone())?);
    let stats = knowledge.import(export).await?;
    if stats.errors_skipped > 0 {
        warn!(skipped = stats.errors_skipped, "Some knowledge records were skipped");
    }

    let ranker = FixRanker::new(knowledge, config.ranker.clone())?
        .with_observer(Arc::new(LoggingNoveltyObserver));
    let mut suggestions = ranker.suggest_fixes(&target).await?;
    if let Some(limit) = args.limit {
        suggestions.truncate(limit);
    }

    info!(
        known_errors = stats.errors_imported,
        suggestions = suggestions.len(),
        "Suggestions ranked"
    );
    write_json(&suggestions, args.output.as_ref())
}
