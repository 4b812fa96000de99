use ragwatch_core::{ControlLimits, DriftConfig};
use ragwatch_recall::{KnowledgeConfig, RankerConfig};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRagwatchConfig {
    #[serde(default)]
    pub drift: RawDriftConfig,

    #[serde(default)]
    pub knowledge: RawKnowledgeConfig,

    #[serde(default)]
    pub ranker: RawRankerConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDriftConfig {
    #[serde(default)]
    pub control_limits: RawControlLimits,
    pub min_events_for_baseline: Option<usize>,
    pub derive_limits: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawControlLimits {
    pub success_rate_lower: Option<f64>,
    pub relevance_score_lower: Option<f64>,
    pub latency_upper: Option<f64>,
    pub sigma: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawKnowledgeConfig {
    pub dimension: Option<usize>,
    pub default_search_limit: Option<usize>,
    pub overfetch_factor: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRankerConfig {
    pub similarity_weight: Option<f64>,
    pub success_weight: Option<f64>,
    pub min_similarity_threshold: Option<f64>,
    pub max_candidates: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RagwatchConfig {
    #[serde(default)]
    pub drift: DriftConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub ranker: RankerConfig,
}

impl RagwatchConfig {
    pub fn validate(&self) -> ragwatch_core::Result<()> {
        self.drift.validate()?;
        self.knowledge.validate()?;
        self.ranker.validate()
    }
}

impl From<RawRagwatchConfig> for RagwatchConfig {
    fn from(raw: RawRagwatchConfig) -> Self {
        let limits = ControlLimits::default();
        let drift = DriftConfig::default();
        let knowledge = KnowledgeConfig::default();
        let ranker = RankerConfig::default();

        Self {
            drift: DriftConfig {
                control_limits: ControlLimits {
                    success_rate_lower: raw
                        .drift
                        .control_limits
                        .success_rate_lower
                        .unwrap_or(limits.success_rate_lower),
                    relevance_score_lower: raw
                        .drift
                        .control_limits
                        .relevance_score_lower
                        .unwrap_or(limits.relevance_score_lower),
                    latency_upper: raw
                        .drift
                        .control_limits
                        .latency_upper
                        .unwrap_or(limits.latency_upper),
                    sigma: raw.drift.control_limits.sigma.unwrap_or(limits.sigma),
                },
                min_events_for_baseline: raw
                    .drift
                    .min_events_for_baseline
                    .unwrap_or(drift.min_events_for_baseline),
                derive_limits: raw.drift.derive_limits.unwrap_or(drift.derive_limits),
            },
            knowledge: KnowledgeConfig {
                dimension: raw.knowledge.dimension.unwrap_or(knowledge.dimension),
                default_search_limit: raw
                    .knowledge
                    .default_search_limit
                    .unwrap_or(knowledge.default_search_limit),
                overfetch_factor: raw
                    .knowledge
                    .overfetch_factor
                    .unwrap_or(knowledge.overfetch_factor),
            },
            ranker: RankerConfig {
                similarity_weight: raw
                    .ranker
                    .similarity_weight
                    .unwrap_or(ranker.similarity_weight),
                success_weight: raw.ranker.success_weight.unwrap_or(ranker.success_weight),
                min_similarity_threshold: raw
                    .ranker
                    .min_similarity_threshold
                    .unwrap_or(ranker.min_similarity_threshold),
                max_candidates: raw.ranker.max_candidates.unwrap_or(ranker.max_candidates),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = RagwatchConfig::default();
        assert_eq!(config.drift.min_events_for_baseline, 10);
        assert_eq!(config.knowledge.dimension, 384);
        assert_eq!(config.ranker.similarity_weight, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_raw_finalizes_with_defaults() {
        let raw: RawRagwatchConfig = toml::from_str(
            r#"
[drift.control_limits]
latency_upper = 750.0

[ranker]
max_candidates = 5
"#,
        )
        .unwrap();

        let config = RagwatchConfig::from(raw);
        assert_eq!(config.drift.control_limits.latency_upper, 750.0);
        assert_eq!(config.drift.control_limits.success_rate_lower, 0.9);
        assert_eq!(config.ranker.max_candidates, 5);
        assert_eq!(config.ranker.success_weight, 0.4);
        assert_eq!(config.knowledge, KnowledgeConfig::default());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = RagwatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[drift.control_limits]"));
        let parsed: RagwatchConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
