//! Single-flight background indexing.
//!
//! Orchestrates:
//! 1. Detecting the languages a project uses
//! 2. Running one SCIP indexer per language into the work dir
//! 3. Merging the per-language indexes
//! 4. Converting the merged index into the symbol store
//! 5. Recording freshness metadata next to the store

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::convert::Converter;
use super::events::{EventSink, EventType, IndexEvent};
use super::merge::{self, MergeSummary};
use super::metadata::{self, IndexMetadata};
use crate::config::Config;
use crate::indexer::{self, IndexerError, IndexerManager, Language};

/// File name of the merged index in the work dir.
pub const MERGED_INDEX: &str = "index.scip";

/// Parameters of one indexing run.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub project_root: PathBuf,
    /// Directory for per-language and merged index files.
    pub work_dir: PathBuf,
    pub store_path: PathBuf,
    /// Language filter by name. Empty means every detected language.
    pub languages: Vec<String>,
    /// Merge all per-language indexes. When false only the first one is converted.
    pub merge: bool,
}

/// Snapshot of the current or most recent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStatus {
    pub in_progress: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub languages: Vec<Language>,
    pub project_root: PathBuf,
    pub work_dir: PathBuf,
    pub store_path: PathBuf,
}

/// Steps of an indexing run.
///
/// Fixed when an [`AsyncIndexer`] is built. [`DefaultPipeline`] wires the real
/// components.
pub trait IndexPipeline: Send + Sync + 'static {
    fn detect_languages(&self, root: &Path) -> impl Future<Output = Result<Vec<Language>>> + Send;

    fn ensure_indexer(&self, language: Language) -> impl Future<Output = Result<PathBuf, IndexerError>> + Send;

    fn run_indexer(
        &self,
        language: Language,
        project_dir: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), IndexerError>> + Send;

    fn merge_indexes(&self, inputs: &[PathBuf], output: &Path) -> impl Future<Output = Result<MergeSummary>> + Send;

    fn convert(&self, index_path: &Path, store_path: &Path) -> impl Future<Output = Result<()>> + Send;

    fn build_metadata(
        &self,
        root: &Path,
        languages: &[Language],
    ) -> impl Future<Output = Result<IndexMetadata>> + Send;

    fn save_metadata(&self, store_path: &Path, metadata: &IndexMetadata) -> impl Future<Output = Result<()>> + Send;
}

/// The real pipeline: downloaded indexers, the external converter, and
/// filesystem work run on the blocking pool.
pub struct DefaultPipeline {
    indexers: IndexerManager,
    converter: Converter,
}

impl DefaultPipeline {
    pub fn new(indexers: IndexerManager, converter: Converter) -> Self {
        Self { indexers, converter }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.indexer_manager()?, config.converter()))
    }
}

impl IndexPipeline for DefaultPipeline {
    async fn detect_languages(&self, root: &Path) -> Result<Vec<Language>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || indexer::detect_languages(&root))
            .await
            .context("Language detection task failed")
    }

    async fn ensure_indexer(&self, language: Language) -> Result<PathBuf, IndexerError> {
        self.indexers.ensure_indexer(language).await
    }

    async fn run_indexer(&self, language: Language, project_dir: &Path, output: &Path) -> Result<(), IndexerError> {
        self.indexers.run_indexer(language, project_dir, output).await
    }

    async fn merge_indexes(&self, inputs: &[PathBuf], output: &Path) -> Result<MergeSummary> {
        let inputs = inputs.to_vec();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || merge::merge_indexes(&inputs, &output))
            .await
            .context("Merge task failed")?
    }

    async fn convert(&self, index_path: &Path, store_path: &Path) -> Result<()> {
        self.converter.convert(index_path, store_path).await
    }

    async fn build_metadata(&self, root: &Path, languages: &[Language]) -> Result<IndexMetadata> {
        let root = root.to_path_buf();
        let languages = languages.to_vec();
        tokio::task::spawn_blocking(move || metadata::build_metadata(&root, &languages))
            .await
            .context("Metadata task failed")?
    }

    async fn save_metadata(&self, store_path: &Path, metadata: &IndexMetadata) -> Result<()> {
        metadata::save_metadata(store_path, metadata)
    }
}

/// Invoked after a successful run. An error marks the run failed.
pub type SuccessCallback = Box<dyn Fn(&IndexStatus) -> Result<()> + Send + Sync>;

/// Runs at most one indexing pipeline at a time in the background.
pub struct AsyncIndexer<P> {
    inner: Arc<Inner<P>>,
}

struct Inner<P> {
    pipeline: P,
    sink: Arc<dyn EventSink>,
    on_success: Option<SuccessCallback>,
    status: Mutex<IndexStatus>,
}

impl<P: IndexPipeline> AsyncIndexer<P> {
    pub fn new(pipeline: P, sink: Arc<dyn EventSink>, on_success: Option<SuccessCallback>) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                sink,
                on_success,
                status: Mutex::new(IndexStatus::default()),
            }),
        }
    }

    /// Start a run on the tokio runtime.
    ///
    /// Returns false, changing nothing, while another run is in progress.
    pub fn start_async(&self, request: IndexRequest) -> bool {
        {
            let mut status = self.inner.lock_status();
            if status.in_progress {
                debug!(project = %request.project_root.display(), "indexing already in progress");
                return false;
            }
            *status = IndexStatus {
                in_progress: true,
                started_at: Some(Utc::now()),
                languages: parse_filter(&request.languages),
                project_root: request.project_root.clone(),
                work_dir: request.work_dir.clone(),
                store_path: request.store_path.clone(),
                ..IndexStatus::default()
            };
        }

        info!(project = %request.project_root.display(), store = %request.store_path.display(), "indexing started");
        self.inner.sink.publish(IndexEvent::new(
            EventType::Start,
            format!("indexing {}", request.project_root.display()),
        ));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.run(request));
        true
    }

    pub fn status(&self) -> IndexStatus {
        self.inner.lock_status().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_status().in_progress
    }
}

impl<P: IndexPipeline> Inner<P> {
    fn lock_status(&self) -> MutexGuard<'_, IndexStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn progress(&self, language: Option<Language>, message: impl Into<String>) {
        let event = IndexEvent::new(EventType::Progress, message);
        self.sink.publish(match language {
            Some(language) => event.with_language(language),
            None => event,
        });
    }

    async fn run(self: Arc<Self>, request: IndexRequest) {
        let started = Instant::now();

        // A panicking step must still end the run and clear the running flag
        let worker = Arc::clone(&self);
        let job = request.clone();
        let mut result = match tokio::spawn(async move { worker.execute(&job).await }).await {
            Ok(result) => result,
            Err(e) => Err(anyhow!("indexing task failed: {e}")),
        };

        {
            let mut status = self.lock_status();
            status.completed_at = Some(Utc::now());
            status.duration_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
            if let Ok(languages) = &result {
                status.languages = languages.clone();
            }
        }

        if result.is_ok() {
            if let Some(callback) = &self.on_success {
                let snapshot = self.lock_status().clone();
                if let Err(e) = callback(&snapshot).context("Success callback failed") {
                    result = Err(e);
                }
            }
        }

        let event = {
            let mut status = self.lock_status();
            status.in_progress = false;
            match &result {
                Ok(languages) => {
                    status.error = None;
                    let names: Vec<&str> = languages.iter().map(|l| l.as_str()).collect();
                    info!(duration_ms = ?status.duration_ms, languages = ?names, "indexing complete");
                    let indexed = if names.is_empty() {
                        "existing index".to_string()
                    } else {
                        names.join(", ")
                    };
                    IndexEvent::new(
                        EventType::Complete,
                        format!("indexed {indexed} into {}", request.store_path.display()),
                    )
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    error!(error = %message, "indexing failed");
                    status.error = Some(message.clone());
                    IndexEvent::new(EventType::Error, message)
                }
            }
        };
        self.sink.publish(event);
    }

    /// Run every step, returning the languages whose indexes went into the store.
    async fn execute(&self, request: &IndexRequest) -> Result<Vec<Language>> {
        if request.project_root.as_os_str().is_empty() {
            bail!("project root is required");
        }
        let root = &request.project_root;
        let work_dir = &request.work_dir;

        tokio::fs::create_dir_all(work_dir)
            .await
            .with_context(|| format!("Failed to create work dir {}", work_dir.display()))?;

        let detected = self.pipeline.detect_languages(root).await?;
        let filter = parse_filter(&request.languages);
        let selected = select_languages(&detected, &filter);
        info!(detected = ?detected, selected = ?selected, "languages resolved");
        self.progress(None, format!("detected {} language(s)", selected.len()));

        for &language in &selected {
            if let Err(e) = self.pipeline.ensure_indexer(language).await {
                warn!(language = %language, error = %e, "indexer unavailable, skipping");
                self.progress(Some(language), format!("indexer unavailable: {e}"));
                continue;
            }

            let output = language_index_path(work_dir, language);
            self.progress(Some(language), "running indexer");
            match self.pipeline.run_indexer(language, root, &output).await {
                Ok(()) => self.progress(Some(language), "indexed"),
                Err(e) => {
                    warn!(language = %language, error = %e, "indexer failed, skipping");
                    self.progress(Some(language), format!("indexer failed: {e}"));
                }
            }
        }

        let mut inputs = collect_language_indexes(work_dir, &filter)?;
        let merged_path = merged_index_path(work_dir);

        let (index_path, used) = if inputs.is_empty() {
            if filter.is_empty() && merged_path.is_file() {
                info!(index = %merged_path.display(), "reusing existing merged index");
                (merged_path, selected)
            } else {
                bail!("no indexes found in {}", work_dir.display());
            }
        } else if !request.merge {
            let (language, first) = inputs.remove(0);
            for (_, ignored) in &inputs {
                info!(index = %ignored.display(), "merge disabled, ignoring index");
            }
            (first, vec![language])
        } else {
            let used: Vec<Language> = inputs.iter().map(|(l, _)| *l).collect();
            let paths: Vec<PathBuf> = inputs.into_iter().map(|(_, p)| p).collect();
            let summary = self
                .pipeline
                .merge_indexes(&paths, &merged_path)
                .await
                .context("Failed to merge indexes")?;
            self.progress(
                None,
                format!("merged {} index(es), {} document(s)", summary.inputs, summary.documents),
            );
            (merged_path, used)
        };

        if let Some(parent) = request.store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        self.pipeline
            .convert(&index_path, &request.store_path)
            .await
            .context("Failed to convert index")?;
        self.progress(None, format!("wrote {}", request.store_path.display()));

        match self.pipeline.build_metadata(root, &used).await {
            Ok(meta) => {
                if let Err(e) = self.pipeline.save_metadata(&request.store_path, &meta).await {
                    warn!(error = %format!("{e:#}"), "failed to save index metadata");
                }
            }
            Err(e) => warn!(error = %format!("{e:#}"), "failed to build index metadata"),
        }

        Ok(used)
    }
}

/// Parse a language filter, dropping unknown names.
fn parse_filter(names: &[String]) -> Vec<Language> {
    let mut languages = Vec::new();
    for name in names {
        match name.parse::<Language>() {
            Ok(language) if !languages.contains(&language) => languages.push(language),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "ignoring language filter entry"),
        }
    }
    languages
}

/// Detected languages, narrowed to `filter` when it is non-empty.
fn select_languages(detected: &[Language], filter: &[Language]) -> Vec<Language> {
    detected
        .iter()
        .copied()
        .filter(|l| filter.is_empty() || filter.contains(l))
        .collect()
}

pub fn language_index_path(work_dir: &Path, language: Language) -> PathBuf {
    work_dir.join(format!("index.{}.scip", language.as_str()))
}

pub fn merged_index_path(work_dir: &Path) -> PathBuf {
    work_dir.join(MERGED_INDEX)
}

/// Per-language index files in `work_dir`, in language priority order.
fn collect_language_indexes(work_dir: &Path, filter: &[Language]) -> Result<Vec<(Language, PathBuf)>> {
    let entries = std::fs::read_dir(work_dir)
        .with_context(|| format!("Failed to read work dir {}", work_dir.display()))?;

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == MERGED_INDEX || name.ends_with(".tmp") {
            continue;
        }
        let Some(language) = name
            .strip_prefix("index.")
            .and_then(|rest| rest.strip_suffix(".scip"))
            .and_then(|lang| Language::ALL.into_iter().find(|l| l.as_str() == lang))
        else {
            continue;
        };
        if filter.is_empty() || filter.contains(&language) {
            found.push((language, path));
        }
    }

    found.sort_by_key(|(language, _)| *language);
    Ok(found)
}
