//! Search command - find symbols by name.

use anyhow::Result;
use clap::Args;

use super::{StoreArgs, print_json};

#[derive(Args)]
pub struct SearchCmd {
    /// Substring of a symbol identifier or display name
    pub query: String,

    /// Max results
    #[arg(short, long, default_value = "20")]
    pub limit: i64,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl SearchCmd {
    pub async fn run(&self) -> Result<()> {
        let index = self.store.open().await?;

        let start = std::time::Instant::now();
        let results = index.find_symbols(&self.query, self.limit).await?;
        let elapsed = start.elapsed().as_millis();
        index.close().await;

        if self.store.json {
            return print_json(&results);
        }

        println!("Found {} results in {}ms\n", results.len(), elapsed);
        for (i, r) in results.iter().enumerate() {
            println!("{}. {} `{}`", i + 1, r.kind, r.name);
            println!("   {}", r.symbol);
            match (&r.file_path, r.line) {
                (Some(path), Some(line)) => println!("   {}:{}", path, line + 1),
                (Some(path), None) => println!("   {}", path),
                _ => {}
            }
        }
        Ok(())
    }
}
