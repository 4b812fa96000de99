//! Export/Import of the knowledge base for backup and portability

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ragwatch_core::Result;

use crate::knowledge::KnowledgeBase;
use crate::types::ErrorRecord;

/// Current version of the export format
pub const EXPORT_VERSION: u32 = 1;

/// Complete export of stored errors with their fixes and embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub errors: Vec<ErrorRecord>,
}

impl KnowledgeExport {
    pub fn new() -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            errors: vec![],
        }
    }
}

impl Default for KnowledgeExport {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from an import operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportStats {
    pub errors_imported: u32,
    pub errors_skipped: u32,
    pub fixes_imported: u32,
}

impl KnowledgeBase {
    /// Snapshot every stored error, oldest first.
    pub async fn export(&self) -> Result<KnowledgeExport> {
        let mut errors = self.all_errors().await?;
        errors.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(KnowledgeExport {
            errors,
            ..KnowledgeExport::new()
        })
    }

    /// Store each exported error through the normal validation path.
    ///
    /// Records that fail validation or whose id already exists are skipped
    /// and counted rather than aborting the import.
    pub async fn import(&self, export: KnowledgeExport) -> Result<ImportStats> {
        if export.version != EXPORT_VERSION {
            warn!(
                version = export.version,
                expected = EXPORT_VERSION,
                "Importing export with a different format version"
            );
        }

        let mut stats = ImportStats::default();
        for record in export.errors {
            let fixes = record.fixes.len() as u32;
            match self.store_error(record).await {
                Ok(_) => {
                    stats.errors_imported += 1;
                    stats.fixes_imported += fixes;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping error record");
                    stats.errors_skipped += 1;
                }
            }
        }

        info!(
            imported = stats.errors_imported,
            skipped = stats.errors_skipped,
            "Knowledge import complete"
        );
        Ok(stats)
    }
}
