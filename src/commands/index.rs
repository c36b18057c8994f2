//! Index command - build the symbol store for a project.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::config::{Config, default_store_path, default_work_dir};
use crate::pipeline::{
    AsyncIndexer, ChannelSink, DefaultPipeline, IndexRequest, IndexStatus, LogSink,
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Args)]
pub struct IndexCmd {
    /// Project root to index (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only index these languages (comma-separated, e.g. go,python)
    #[arg(short, long, value_delimiter = ',')]
    pub lang: Vec<String>,

    /// Store path (default: <path>/.codeintel/index.db)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Directory for intermediate index files (default: <path>/.codeintel/work)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Convert only the first per-language index instead of merging them all
    #[arg(long)]
    pub no_merge: bool,

    /// Print lifecycle events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Send lifecycle events to the log (RUST_LOG) instead of stdout
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,
}

impl IndexCmd {
    pub async fn run(&self) -> Result<()> {
        let config = Config::load()?;
        let pipeline = DefaultPipeline::from_config(&config)?;

        let project_root = std::path::absolute(&self.path)
            .with_context(|| format!("Invalid project path {}", self.path.display()))?;
        let request = IndexRequest {
            store_path: self.store.clone().unwrap_or_else(|| default_store_path(&project_root)),
            work_dir: self.work_dir.clone().unwrap_or_else(|| default_work_dir(&project_root)),
            project_root,
            languages: self.lang.clone(),
            merge: !self.no_merge,
        };

        if self.quiet {
            let indexer = AsyncIndexer::new(pipeline, Arc::new(LogSink), None);
            if !indexer.start_async(request) {
                bail!("An indexing run is already in progress");
            }
            while indexer.is_running() {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            return finish(indexer.status(), false);
        }

        let (sink, mut events) = ChannelSink::new();
        let indexer = AsyncIndexer::new(pipeline, Arc::new(sink), None);
        if !indexer.start_async(request) {
            bail!("An indexing run is already in progress");
        }

        while let Some(event) = events.recv().await {
            if self.json {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                match event.language {
                    Some(language) => println!("[{}] {}", language, event.message),
                    None => println!("{}", event.message),
                }
            }
            if event.event_type.is_terminal() {
                break;
            }
        }

        finish(indexer.status(), !self.json)
    }
}

fn finish(status: IndexStatus, summary: bool) -> Result<()> {
    if let Some(error) = status.error {
        bail!("Indexing failed: {}", error);
    }

    if summary {
        println!();
        println!(
            "Done in {}ms: {}",
            status.duration_ms.unwrap_or_default(),
            status.store_path.display()
        );
    }
    Ok(())
}
