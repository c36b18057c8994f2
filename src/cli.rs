//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{
    ConfigCmd, DefinitionCmd, DetectCmd, IndexCmd, InstallCmd, ReferencesCmd, SearchCmd, StatsCmd,
    StatusCmd, SymbolsCmd, TypeInfoCmd,
};

#[derive(Parser)]
#[command(name = "cidx")]
#[command(about = "codeintel - persistent SCIP symbol index for your project")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index a project into the symbol store
    Index(IndexCmd),

    /// Show which languages a project uses
    Detect(DetectCmd),

    /// Download indexers ahead of time
    Install(InstallCmd),

    /// Search symbols by name
    Search(SearchCmd),

    /// Show where a symbol is defined
    #[command(alias = "def")]
    Definition(DefinitionCmd),

    /// List references to a symbol
    #[command(alias = "refs")]
    References(ReferencesCmd),

    /// List symbols defined in a file
    Symbols(SymbolsCmd),

    /// Show a symbol's signature
    TypeInfo(TypeInfoCmd),

    /// Show store statistics
    Stats(StatsCmd),

    /// Show whether the store is up to date with the sources
    Status(StatusCmd),

    /// Manage configuration (indexers, converter)
    Config(ConfigCmd),
}

impl Command {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match self {
            Command::Index(cmd) => cmd.run().await,
            Command::Detect(cmd) => cmd.run().await,
            Command::Install(cmd) => cmd.run().await,
            Command::Search(cmd) => cmd.run().await,
            Command::Definition(cmd) => cmd.run().await,
            Command::References(cmd) => cmd.run().await,
            Command::Symbols(cmd) => cmd.run().await,
            Command::TypeInfo(cmd) => cmd.run().await,
            Command::Stats(cmd) => cmd.run().await,
            Command::Status(cmd) => cmd.run().await,
            Command::Config(cmd) => cmd.run().await,
        }
    }
}
