//! Detect command - show which languages a project uses.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::indexer::{detect_languages, indexer_for};

#[derive(Args)]
pub struct DetectCmd {
    /// Project root to scan (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

impl DetectCmd {
    pub async fn run(&self) -> Result<()> {
        let root = self.path.clone();
        let languages = tokio::task::spawn_blocking(move || detect_languages(&root)).await?;

        if languages.is_empty() {
            println!("No supported languages found in {}", self.path.display());
            return Ok(());
        }

        for language in languages {
            let pinned = indexer_for(language)?;
            println!("{:<12} {} {}", language, pinned.name, pinned.version);
        }
        Ok(())
    }
}
