// Analysis configuration
// Parameters accepted from the caller, loadable from a JSON file

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::fragments::{PruningPolicy, RankingPolicy, DEFAULT_LIMIT};
use crate::pipeline::Pipeline;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Settings for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Clustering window size: consecutive pitch values the clustering
    /// routine used to tell fragments apart. Extends every window end.
    pub n: usize,

    /// Maximum number of fragments returned
    pub limit: usize,

    /// Ranking policy applied to the reconstructed fragments
    pub policy: RankingPolicy,

    /// Which stage order to run
    pub pipeline: Pipeline,

    /// Optional early-stop rule for fragments padded by long pauses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pruning: Option<PruningPolicy>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            n: 16,
            limit: DEFAULT_LIMIT,
            policy: RankingPolicy::DetectionOrder,
            pipeline: Pipeline::ReconstructThenRank,
            pruning: None,
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON document; missing keys take defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::InvalidValue(
                "n must be a positive window size".to_string(),
            ));
        }

        if self.limit == 0 {
            return Err(ConfigError::InvalidValue(
                "limit must be at least 1".to_string(),
            ));
        }

        if let Some(pruning) = &self.pruning {
            if !pruning.max_pause.is_finite() || pruning.max_pause < 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "pruning.max_pause must be a non-negative number of seconds, got {}",
                    pruning.max_pause
                )));
            }
        }

        Ok(())
    }
}
