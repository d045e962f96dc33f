//! Configuration file support for the CLI.
//!
//! Loads CLI configuration from TOML files. The `[store]` table
//! carries the storage settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tabula_common::StoreConfig;

use crate::formatter::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default output format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// History file path.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Maximum history size.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Suppress the banner.
    #[serde(default)]
    pub quiet: bool,

    /// Storage settings.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_history_size() -> usize {
    1000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            history_file: None,
            history_size: default_history_size(),
            quiet: false,
            store: StoreConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads the default configuration file.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/tabula/config.toml
    /// 2. ~/.tabula/config.toml
    /// 3. Returns default if not found
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".tabula").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tabula").join("config.toml"))
    }
}
