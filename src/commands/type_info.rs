//! Type info command - print a symbol's signature.

use anyhow::Result;
use clap::Args;

use super::{StoreArgs, print_json};

#[derive(Args)]
pub struct TypeInfoCmd {
    /// Full SCIP symbol identifier
    pub symbol: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl TypeInfoCmd {
    pub async fn run(&self) -> Result<()> {
        let index = self.store.open().await?;
        let signature = index.get_type_info(&self.symbol).await?;
        index.close().await;

        if self.store.json {
            return print_json(&serde_json::json!({
                "symbol": self.symbol,
                "signature": signature,
            }));
        }

        if signature.is_empty() {
            println!("(no signature)");
        } else {
            println!("{}", signature);
        }
        Ok(())
    }
}
