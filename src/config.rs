// src/config.rs
//! Analyzer configuration: TOML file with env-var path override and a silent
//! fallback to defaults when no file exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

pub const ENV_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Directory holding `<product_key>_tweets.json` dataset files.
    pub dataset_dir: PathBuf,
    /// Shared pool file inside `dataset_dir`.
    pub shared_pool_file: String,
    /// How many samples one analysis targets.
    pub sample_target: usize,
    /// TTL for the external-lookup cache, seconds.
    pub cache_ttl_secs: u64,
    /// Upper bound on one external lookup, milliseconds.
    pub lookup_timeout_ms: u64,
    /// Whether the synthetic resolver tier is available.
    pub synthetic_fallback: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("tweet_datasets"),
            shared_pool_file: "all_products_tweets.json".to_string(),
            sample_target: 200,
            cache_ttl_secs: 3600,
            lookup_timeout_ms: 5000,
            synthetic_fallback: true,
        }
    }
}

impl AnalyzerConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading analyzer config from {}", path.display()))?;
        let cfg: Self = toml::from_str(&content)
            .with_context(|| format!("parsing analyzer config at {}", path.display()))?;
        Ok(cfg)
    }

    /// Resolution order:
    /// 1. `$ANALYZER_CONFIG_PATH` (must parse if set),
    /// 2. `config/analyzer.toml` if present,
    /// 3. built-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        info!("no analyzer config file, using defaults");
        Ok(Self::default())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.sample_target, 200);
        assert_eq!(cfg.cache_ttl_secs, 3600);
        assert!(cfg.synthetic_fallback);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: AnalyzerConfig =
            toml::from_str("sample_target = 25\nsynthetic_fallback = false").unwrap();
        assert_eq!(cfg.sample_target, 25);
        assert!(!cfg.synthetic_fallback);
        assert_eq!(cfg.cache_ttl_secs, 3600);
        assert_eq!(cfg.shared_pool_file, "all_products_tweets.json");
    }

    #[test]
    fn missing_explicit_file_errors_with_context() {
        let err = AnalyzerConfig::load_from(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
