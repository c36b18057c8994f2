//! Merge per-language SCIP indexes into one.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protobuf::Message;
use scip::types::Index;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("document {path} appears in both {first} and {second}")]
    DuplicateDocument {
        path: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Counts for a completed merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub inputs: usize,
    pub documents: usize,
    pub external_symbols: usize,
}

/// Read a SCIP index file.
pub fn read_index(path: &Path) -> Result<Index> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Index::parse_from_bytes(&bytes)
        .with_context(|| format!("Failed to parse SCIP index {}", path.display()))
}

/// Write a SCIP index file through a temp file in the same directory.
pub fn write_index(index: &Index, path: &Path) -> Result<()> {
    let bytes = index
        .write_to_bytes()
        .context("Failed to serialize SCIP index")?;

    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&bytes)?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Combine `inputs` into a single index at `output`.
///
/// Documents and external symbols are concatenated in input order. The first
/// input carrying a non-empty project root provides the metadata. Two inputs
/// declaring the same document path fail the merge before `output` is touched.
pub fn merge_indexes(inputs: &[PathBuf], output: &Path) -> Result<MergeSummary> {
    let mut merged = Index::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for input in inputs {
        let index = read_index(input)?;
        debug!(input = %input.display(), documents = index.documents.len(), "merging index");

        if merged.metadata.is_none() {
            if let Some(metadata) = index.metadata.as_ref() {
                if !metadata.project_root.is_empty() {
                    merged.metadata = index.metadata.clone();
                }
            }
        }

        for document in &index.documents {
            if let Some(first) = seen.get(&document.relative_path) {
                return Err(MergeError::DuplicateDocument {
                    path: document.relative_path.clone(),
                    first: first.clone(),
                    second: input.clone(),
                }
                .into());
            }
            seen.insert(document.relative_path.clone(), input.clone());
        }

        merged.documents.extend(index.documents);
        merged.external_symbols.extend(index.external_symbols);
    }

    write_index(&merged, output)?;

    let summary = MergeSummary {
        inputs: inputs.len(),
        documents: merged.documents.len(),
        external_symbols: merged.external_symbols.len(),
    };
    info!(
        inputs = summary.inputs,
        documents = summary.documents,
        external_symbols = summary.external_symbols,
        output = %output.display(),
        "merged indexes"
    );
    Ok(summary)
}
