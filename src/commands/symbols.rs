//! Symbols command - list the symbols defined in a file.

use anyhow::Result;
use clap::Args;

use super::{StoreArgs, print_json};

#[derive(Args)]
pub struct SymbolsCmd {
    /// File path relative to the project root, as indexed
    pub file: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl SymbolsCmd {
    pub async fn run(&self) -> Result<()> {
        let index = self.store.open().await?;
        let symbols = index.get_symbols_in_file(&self.file).await?;
        index.close().await;

        if self.store.json {
            return print_json(&symbols);
        }

        if symbols.is_empty() {
            println!("No symbols defined in {}", self.file);
            return Ok(());
        }
        for s in &symbols {
            println!("{:>5}  {:<12} {}", s.location.start_line + 1, s.kind, s.name);
        }
        Ok(())
    }
}
