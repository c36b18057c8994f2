//! Status command - report whether the store matches the sources.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{StoreArgs, print_json};
use crate::pipeline::{IndexMetadata, is_fresh, load_metadata};

#[derive(Args)]
pub struct StatusCmd {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Serialize)]
struct StatusReport {
    store: String,
    exists: bool,
    fresh: Option<bool>,
    metadata: Option<IndexMetadata>,
}

impl StatusCmd {
    pub async fn run(&self) -> Result<()> {
        let path = self.store.store_path();
        let exists = path.is_file();
        let metadata = if exists { load_metadata(&path)? } else { None };

        let fresh = match &metadata {
            Some(meta) => {
                let meta = meta.clone();
                Some(tokio::task::spawn_blocking(move || is_fresh(&meta)).await??)
            }
            None => None,
        };

        if self.store.json {
            return print_json(&StatusReport {
                store: path.display().to_string(),
                exists,
                fresh,
                metadata,
            });
        }

        if !exists {
            println!("No store at {}. Run `cidx index` first.", path.display());
            return Ok(());
        }

        println!("Store:      {}", path.display());
        let Some(meta) = metadata else {
            println!("Metadata:   (missing, freshness unknown)");
            return Ok(());
        };

        let languages: Vec<&str> = meta.languages.iter().map(|l| l.as_str()).collect();
        println!("Project:    {}", meta.project_root.display());
        println!("Languages:  {}", languages.join(", "));
        println!("Built:      {}", meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!(
            "State:      {}",
            if fresh == Some(true) {
                "up to date"
            } else {
                "stale (run `cidx index` to rebuild)"
            }
        );
        Ok(())
    }
}
