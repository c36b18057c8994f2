//! Configuration management.
//!
//! Config is stored at `~/.config/codeintel/config.toml` and contains:
//! - Where downloaded indexers are installed
//! - The converter tool and its subcommand
//! - Per-language indexer overrides (a local executable path or an asset URL)

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::indexer::{IndexerManager, Language};
use crate::pipeline::Converter;

const CONFIG_DIR: &str = "codeintel";
const CONFIG_FILE: &str = "config.toml";

/// Per-project tool state directory.
pub const STATE_DIR: &str = ".codeintel";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Install root for downloaded indexers.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,

    /// Executable that converts a SCIP index into a store (default: scip).
    #[serde(default = "default_converter")]
    pub converter: String,

    #[serde(default = "default_convert_subcommand")]
    pub convert_subcommand: String,

    /// Language name → local executable path or asset URL.
    #[serde(default)]
    pub indexers: BTreeMap<String, String>,
}

fn default_bin_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(STATE_DIR))
        .join(CONFIG_DIR)
        .join("bin")
}

fn default_converter() -> String {
    "scip".to_string()
}

fn default_convert_subcommand() -> String {
    "expt-convert".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            converter: default_converter(),
            convert_subcommand: default_convert_subcommand(),
            indexers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Indexer overrides keyed by language.
    pub fn indexer_overrides(&self) -> Result<HashMap<Language, String>> {
        self.indexers
            .iter()
            .map(|(name, target)| {
                let language = name
                    .parse::<Language>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid [indexers] entry in config")?;
                Ok((language, target.clone()))
            })
            .collect()
    }

    pub fn indexer_manager(&self) -> Result<IndexerManager> {
        Ok(IndexerManager::new(&self.bin_dir).with_overrides(self.indexer_overrides()?))
    }

    pub fn converter(&self) -> Converter {
        Converter::new(&self.converter, &self.convert_subcommand)
    }
}

/// Default store path for a project.
pub fn default_store_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join("index.db")
}

/// Default work dir for intermediate index files.
pub fn default_work_dir(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join("work")
}
