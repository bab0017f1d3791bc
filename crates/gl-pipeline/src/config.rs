//! Pipeline configuration, loadable from TOML.

use serde::Deserialize;
use std::path::PathBuf;

use gl_query::OptimizerConfig;

/// Top-level configuration for the command pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Directory for the transaction and error logs plus snapshots.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Number of state snapshots retained for rollback.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
    /// Interpretation cache capacity.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Optimizer thresholds.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".geolingua")
}

fn default_max_snapshots() -> usize {
    10
}

fn default_cache_capacity() -> usize {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            max_snapshots: default_max_snapshots(),
            cache_capacity: default_cache_capacity(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_config() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.log_dir, PathBuf::from(".geolingua"));
        assert_eq!(config.max_snapshots, 10);
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.optimizer.large_dataset_threshold, 50_000);
        assert_eq!(config.optimizer.memory_limit_mb, 512.0);
    }

    #[test]
    fn deserialize_full_config() {
        let toml = r#"
log_dir = "/var/lib/geolingua"
max_snapshots = 25
cache_capacity = 500

[optimizer]
large_dataset_threshold = 100000
memory_limit_mb = 1024.0
heavy_layer_threshold = 20000
"#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/var/lib/geolingua"));
        assert_eq!(config.max_snapshots, 25);
        assert_eq!(config.cache_capacity, 500);
        assert_eq!(config.optimizer.large_dataset_threshold, 100_000);
        assert_eq!(config.optimizer.heavy_layer_threshold, 20_000);
    }

    #[test]
    fn partial_optimizer_section_uses_defaults() {
        let toml = r#"
[optimizer]
memory_limit_mb = 256.0
"#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.optimizer.memory_limit_mb, 256.0);
        assert_eq!(config.optimizer.large_dataset_threshold, 50_000);
    }
}
