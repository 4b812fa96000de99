use super::types::{
    RagwatchConfig, RawControlLimits, RawDriftConfig, RawKnowledgeConfig, RawRagwatchConfig,
    RawRankerConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user, then project, then `explicit`)
    ///
    /// Missing user or project files are skipped; a missing explicit file is
    /// an error.
    pub fn load(explicit: Option<&Path>) -> Result<RagwatchConfig> {
        Self::load_layers(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
            explicit,
        )
    }

    fn load_layers(
        user: Option<&Path>,
        project: &Path,
        explicit: Option<&Path>,
    ) -> Result<RagwatchConfig> {
        let mut raw = RawRagwatchConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project)?);
        }

        // Layer 3: --config
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        let config = RagwatchConfig::from(raw);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ragwatch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with RAGWATCH_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("RAGWATCH_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".ragwatch/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawRagwatchConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawRagwatchConfig, overlay: RawRagwatchConfig) -> RawRagwatchConfig {
        RawRagwatchConfig {
            drift: RawDriftConfig {
                control_limits: RawControlLimits {
                    success_rate_lower: overlay
                        .drift
                        .control_limits
                        .success_rate_lower
                        .or(base.drift.control_limits.success_rate_lower),
                    relevance_score_lower: overlay
                        .drift
                        .control_limits
                        .relevance_score_lower
                        .or(base.drift.control_limits.relevance_score_lower),
                    latency_upper: overlay
                        .drift
                        .control_limits
                        .latency_upper
                        .or(base.drift.control_limits.latency_upper),
                    sigma: overlay
                        .drift
                        .control_limits
                        .sigma
                        .or(base.drift.control_limits.sigma),
                },
                min_events_for_baseline: overlay
                    .drift
                    .min_events_for_baseline
                    .or(base.drift.min_events_for_baseline),
                derive_limits: overlay.drift.derive_limits.or(base.drift.derive_limits),
            },
            knowledge: RawKnowledgeConfig {
                dimension: overlay.knowledge.dimension.or(base.knowledge.dimension),
                default_search_limit: overlay
                    .knowledge
                    .default_search_limit
                    .or(base.knowledge.default_search_limit),
                overfetch_factor: overlay
                    .knowledge
                    .overfetch_factor
                    .or(base.knowledge.overfetch_factor),
            },
            ranker: RawRankerConfig {
                similarity_weight: overlay
                    .ranker
                    .similarity_weight
                    .or(base.ranker.similarity_weight),
                success_weight: overlay.ranker.success_weight.or(base.ranker.success_weight),
                min_similarity_threshold: overlay
                    .ranker
                    .min_similarity_threshold
                    .or(base.ranker.min_similarity_threshold),
                max_candidates: overlay.ranker.max_candidates.or(base.ranker.max_candidates),
            },
        }
    }
}
