//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`. Every field has a default,
//! so an empty file and no file are equivalent.
//!
//! ```yaml
//! selection:
//!   detectors_include: [NginxRangeDetector]
//!   detectors_exclude: []
//! decode:
//!   strict_enums: true
//!   recursion_limit: 32
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tsunami_proto::{DecodeOptions, SelectionConfig};

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Detector selection applied by `match`.
    pub selection: SelectionConfig,
    /// Decoder settings applied by `decode`.
    pub decode: DecodeOptions,
}

impl CliConfig {
    /// Load the configuration at `path`, or the defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Parse configuration YAML. Empty input yields the defaults.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(CliConfig::parse("").unwrap(), CliConfig::default());
        assert_eq!(CliConfig::parse("\n  \n").unwrap(), CliConfig::default());
    }

    #[test]
    fn partial_document() {
        let config = CliConfig::parse("decode:\n  strict_enums: true\n").unwrap();
        assert!(config.decode.strict_enums);
        assert_eq!(
            config.decode.recursion_limit,
            tsunami_proto::DEFAULT_RECURSION_LIMIT
        );
        assert!(config.selection.detectors_include.is_empty());
    }

    #[test]
    fn selection_lists() {
        let config = CliConfig::parse(
            "selection:\n  detectors_include: [A, B]\n  detectors_exclude: [B]\n",
        )
        .unwrap();
        assert!(config.selection.admits("A"));
        assert!(!config.selection.admits("B"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(CliConfig::parse("selecton: {}\n").is_err());
    }

    #[test]
    fn unreadable_file() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/tsunami.yaml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
