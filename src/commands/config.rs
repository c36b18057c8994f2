//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Config;
use crate::indexer::Language;

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub command: ConfigSubCmd,
}

#[derive(Subcommand)]
pub enum ConfigSubCmd {
    /// Use a local executable or asset URL instead of the pinned indexer
    SetIndexer(SetIndexerCmd),

    /// Go back to the pinned indexer download
    UnsetIndexer(UnsetIndexerCmd),

    /// Set the converter tool (default: scip)
    SetConverter(SetConverterCmd),

    /// Show current configuration
    Show,
}

#[derive(Args)]
pub struct SetIndexerCmd {
    #[arg(value_enum)]
    pub language: Language,

    /// Executable path, or an http(s)/file URL of the release asset
    pub target: String,
}

#[derive(Args)]
pub struct UnsetIndexerCmd {
    #[arg(value_enum)]
    pub language: Language,
}

#[derive(Args)]
pub struct SetConverterCmd {
    /// Converter executable (e.g., /usr/local/bin/scip)
    pub tool: String,

    /// Subcommand that writes the store
    #[arg(long, default_value = "expt-convert")]
    pub subcommand: String,
}

impl ConfigCmd {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            ConfigSubCmd::SetIndexer(cmd) => {
                let mut config = Config::load()?;
                config
                    .indexers
                    .insert(cmd.language.as_str().to_string(), cmd.target.clone());
                config.save()?;
                println!("{} indexer set to: {}", cmd.language, cmd.target);
            }
            ConfigSubCmd::UnsetIndexer(cmd) => {
                let mut config = Config::load()?;
                config.indexers.remove(cmd.language.as_str());
                config.save()?;
                println!("{} indexer reset to the pinned release.", cmd.language);
            }
            ConfigSubCmd::SetConverter(cmd) => {
                let mut config = Config::load()?;
                config.converter = cmd.tool.clone();
                config.convert_subcommand = cmd.subcommand.clone();
                config.save()?;
                println!("Converter set to: {} {}", cmd.tool, cmd.subcommand);
            }
            ConfigSubCmd::Show => {
                let config = Config::load()?;
                println!("Config: {}", Config::config_path()?.display());
                println!();
                println!("bin_dir:    {}", config.bin_dir.display());
                println!("converter:  {} {}", config.converter, config.convert_subcommand);
                if config.indexers.is_empty() {
                    println!("indexers:   (pinned releases)");
                } else {
                    println!("indexers:");
                    for (language, target) in &config.indexers {
                        println!("  {:<10} {}", language, target);
                    }
                }
            }
        }
        Ok(())
    }
}
