//! Stats command - show store statistics.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use super::{StoreArgs, print_json};

#[derive(Args)]
pub struct StatsCmd {
    #[command(flatten)]
    pub store: StoreArgs,
}

impl StatsCmd {
    pub async fn run(&self) -> Result<()> {
        let index = self.store.open().await?;
        let stats = index.get_stats().await?;
        index.close().await;

        if self.store.json {
            return print_json(&stats);
        }

        let path = self.store.store_path();
        println!("Store: {}", path.display());
        println!();
        println!("Documents:   {}", stats.documents);
        println!("Symbols:     {}", stats.symbols);
        println!("Mentions:    {}", stats.mentions);
        println!();
        println!("Size:        {}", format_size(get_file_size(&path)));

        Ok(())
    }
}

fn get_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
