//! CLI command implementations.

mod config;
mod definition;
mod detect;
mod index;
mod install;
mod references;
mod search;
mod stats;
mod status;
mod symbols;
mod type_info;

pub use config::ConfigCmd;
pub use definition::DefinitionCmd;
pub use detect::DetectCmd;
pub use index::IndexCmd;
pub use install::InstallCmd;
pub use references::ReferencesCmd;
pub use search::SearchCmd;
pub use stats::StatsCmd;
pub use status::StatusCmd;
pub use symbols::SymbolsCmd;
pub use type_info::TypeInfoCmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::config::default_store_path;
use crate::store::{Location, SymbolIndex};

/// Which store a query command reads.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Project root (default: current directory)
    #[arg(short = 'C', long, default_value = ".")]
    pub project: PathBuf,

    /// Store path (default: <project>/.codeintel/index.db)
    #[arg(long, env = "CODEINTEL_STORE")]
    pub store: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

impl StoreArgs {
    pub fn store_path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| default_store_path(&self.project))
    }

    pub async fn open(&self) -> Result<SymbolIndex> {
        let path = self.store_path();
        SymbolIndex::open(&path)
            .await
            .with_context(|| format!("Failed to open {}. Run `cidx index` first.", path.display()))
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `path:line:col`, 1-based like editors show it.
fn format_location(location: &Location) -> String {
    format!(
        "{}:{}:{}",
        location.file_path.as_deref().unwrap_or("<unknown>"),
        location.start_line + 1,
        location.start_col + 1
    )
}
