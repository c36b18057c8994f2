//! Install command - download indexers ahead of time.

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::indexer::Language;

#[derive(Args)]
pub struct InstallCmd {
    /// Languages whose indexers to install (default: all)
    #[arg(value_enum)]
    pub languages: Vec<Language>,
}

impl InstallCmd {
    pub async fn run(&self) -> Result<()> {
        let manager = Config::load()?.indexer_manager()?;
        let languages = if self.languages.is_empty() {
            Language::ALL.to_vec()
        } else {
            self.languages.clone()
        };

        for language in languages {
            let path = manager.ensure_indexer(language).await?;
            println!("{:<12} {}", language, path.display());
        }
        Ok(())
    }
}
