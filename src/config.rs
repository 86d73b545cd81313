/// Configuration management for the graph explorer
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub expansion: ExpansionSettings,
    pub pruning: PruningSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionSettings {
    /// Negative means unbounded
    pub default_depth: i64,
    /// Empty means every class may be traversed
    pub allowed_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruningSettings {
    pub preserve_containment_chain: bool,
    pub strip_refs: bool,
    pub force_defaults: bool,
    pub debug_trace: bool,
    pub include_supertypes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub pretty_json: bool,
    /// Records kept per class in the grouped `instances --json` dump, 0 for no limit
    pub preview_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expansion: ExpansionSettings {
                default_depth: 1,
                allowed_classes: Vec::new(),
            },
            pruning: PruningSettings {
                preserve_containment_chain: true,
                strip_refs: false,
                force_defaults: false,
                debug_trace: false,
                include_supertypes: false,
            },
            output: OutputSettings {
                pretty_json: true,
                preview_limit: 0,
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(depth) = std::env::var("EMF_EXPLORER_EXPAND_DEPTH") {
            config.expansion.default_depth = depth
                .parse()
                .context("EMF_EXPLORER_EXPAND_DEPTH must be an integer")?;
        }

        if let Ok(classes) = std::env::var("EMF_EXPLORER_EXPAND_CLASSES") {
            config.expansion.allowed_classes = split_names(&classes);
        }

        if let Ok(preserve) = std::env::var("EMF_EXPLORER_PRESERVE_CONTAINMENT") {
            config.pruning.preserve_containment_chain = preserve
                .parse()
                .context("EMF_EXPLORER_PRESERVE_CONTAINMENT must be true or false")?;
        }

        if let Ok(strip) = std::env::var("EMF_EXPLORER_STRIP_REFS") {
            config.pruning.strip_refs = strip
                .parse()
                .context("EMF_EXPLORER_STRIP_REFS must be true or false")?;
        }

        if let Ok(pretty) = std::env::var("EMF_EXPLORER_PRETTY_JSON") {
            config.output.pretty_json = pretty
                .parse()
                .context("EMF_EXPLORER_PRETTY_JSON must be true or false")?;
        }

        Ok(config)
    }

    /// Defaults overridden by the environment, then by the file when it exists
    pub async fn load_layered<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Config::load_from_env()?;
        if let Some(path) = path {
            let path = path.as_ref();
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                config.merge_with(Config::load_from_file(path).await?);
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
            }
        }
        Ok(config)
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge_with(&mut self, other: Config) {
        if other.expansion.default_depth != 1 {
            self.expansion.default_depth = other.expansion.default_depth;
        }
        if !other.expansion.allowed_classes.is_empty() {
            self.expansion.allowed_classes = other.expansion.allowed_classes;
        }

        self.pruning = other.pruning;

        self.output.pretty_json = other.output.pretty_json;
        if other.output.preview_limit != 0 {
            self.output.preview_limit = other.output.preview_limit;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.expansion.allowed_classes.iter().any(|name| name.trim().is_empty()) {
            return Err(anyhow::anyhow!("Allowed expansion classes must not contain empty names"));
        }

        if self.pruning.debug_trace && !self.pruning.force_defaults {
            return Err(anyhow::anyhow!("debug_trace requires force_defaults to be enabled"));
        }

        Ok(())
    }
}

/// Split a comma-separated class list, dropping blanks
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
