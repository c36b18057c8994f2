//! References command - list every use of a symbol.

use anyhow::Result;
use clap::Args;

use super::{StoreArgs, format_location, print_json};

#[derive(Args)]
pub struct ReferencesCmd {
    /// Full SCIP symbol identifier
    pub symbol: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl ReferencesCmd {
    pub async fn run(&self) -> Result<()> {
        let index = self.store.open().await?;
        let references = index.get_references(&self.symbol).await?;
        index.close().await;

        if self.store.json {
            return print_json(&references);
        }

        println!("{} references\n", references.len());
        for r in &references {
            println!("{:<10} {}", r.role, format_location(&r.location));
        }
        Ok(())
    }
}
