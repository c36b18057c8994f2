//! Definition command - resolve where a symbol is defined.

use anyhow::Result;
use clap::Args;

use super::{StoreArgs, format_location, print_json};

#[derive(Args)]
pub struct DefinitionCmd {
    /// Full SCIP symbol identifier
    pub symbol: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl DefinitionCmd {
    pub async fn run(&self) -> Result<()> {
        let index = self.store.open().await?;
        let symbol = index.get_definition(&self.symbol).await?;
        index.close().await;

        if self.store.json {
            return print_json(&symbol);
        }

        println!("{} `{}`", symbol.kind, symbol.name());
        match &symbol.location {
            Some(location) => println!("{}", format_location(location)),
            None => println!("(no definition site indexed)"),
        }
        if let Some(parent) = &symbol.enclosing_symbol {
            println!("in {}", parent);
        }
        for block in &symbol.documentation {
            println!();
            println!("{}", block);
        }
        Ok(())
    }
}
