//! Index metadata and freshness tracking.
//!
//! The metadata sidecar lives next to the store:
//! ```text
//! {store}.meta.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::indexer::{Language, is_skipped_dir};

/// Sidecar describing which sources an index was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub created_at: DateTime<Utc>,
    pub project_root: PathBuf,
    pub languages: Vec<Language>,
    /// Hex SHA-256 over every hashed source file's path and content.
    pub files_hashed: String,
}

/// Path of the metadata sidecar for a store.
pub fn metadata_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

/// Hash the sources under `root` and record them as index metadata.
pub fn build_metadata(root: &Path, languages: &[Language]) -> Result<IndexMetadata> {
    let files_hashed = hash_sources(root, languages)?;
    Ok(IndexMetadata {
        created_at: Utc::now(),
        project_root: root.to_path_buf(),
        languages: languages.to_vec(),
        files_hashed,
    })
}

/// Whether the sources described by `metadata` are unchanged.
pub fn is_fresh(metadata: &IndexMetadata) -> Result<bool> {
    let current = hash_sources(&metadata.project_root, &metadata.languages)?;
    Ok(current == metadata.files_hashed)
}

/// Persist `metadata` as the sidecar of `store_path`.
pub fn save_metadata(store_path: &Path, metadata: &IndexMetadata) -> Result<()> {
    let path = metadata_path(store_path);
    let content =
        serde_json::to_string_pretty(metadata).context("Failed to serialize index metadata")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Load the sidecar of `store_path`, if one exists.
pub fn load_metadata(store_path: &Path) -> Result<Option<IndexMetadata>> {
    let path = metadata_path(store_path);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let metadata = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(metadata))
}

/// Relative paths (with `/` separators) of files belonging to `languages`, sorted.
///
/// With no languages, every registered language counts. Symlinks are never followed or hashed.
fn source_files(root: &Path, languages: &[Language]) -> Vec<String> {
    let languages = if languages.is_empty() {
        &Language::ALL[..]
    } else {
        languages
    };

    let mut files: Vec<String> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| languages.iter().any(|l| l.matches_path(e.path())))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            let parts: Vec<_> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            Some(parts.join("/"))
        })
        .collect();

    files.sort();
    files
}

/// SHA-256 over `path \0 content \0` for each source file in sorted order.
fn hash_sources(root: &Path, languages: &[Language]) -> Result<String> {
    let files = source_files(root, languages);
    let mut hasher = Sha256::new();
    let mut buf = Vec::new();

    for rel in &files {
        buf.clear();
        let path = root.join(rel);
        std::fs::File::open(&path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .with_context(|| format!("Failed to read {}", path.display()))?;

        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(&buf);
        hasher.update([0u8]);
    }

    debug!(root = %root.display(), files = files.len(), "hashed sources");
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module example.com/app").unwrap();
        std::fs::write(dir.path().join("main.go"), "package main").unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/util.go"), "package pkg").unwrap();
        std::fs::write(dir.path().join("README.md"), "docs").unwrap();
        dir
    }

    #[test]
    fn test_source_files_sorted_and_filtered() {
        let dir = project();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join(".git/objects/x.go"), "").unwrap();
        std::fs::write(dir.path().join("script.py"), "").unwrap();

        assert_eq!(
            source_files(dir.path(), &[Language::Go]),
            vec!["main.go", "pkg/util.go"]
        );
        assert_eq!(
            source_files(dir.path(), &[]),
            vec!["main.go", "pkg/util.go", "script.py"]
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = project();
        let b = project();
        let first = build_metadata(a.path(), &[Language::Go]).unwrap();
        let second = build_metadata(a.path(), &[Language::Go]).unwrap();
        let other_tree = build_metadata(b.path(), &[Language::Go]).unwrap();

        assert_eq!(first.files_hashed, second.files_hashed);
        // Same relative layout and content, different location
        assert_eq!(first.files_hashed, other_tree.files_hashed);
    }

    #[test]
    fn test_fresh_until_changed() {
        let dir = project();
        let metadata = build_metadata(dir.path(), &[Language::Go]).unwrap();
        assert!(is_fresh(&metadata).unwrap());

        // Files outside the hashed languages don't matter
        std::fs::write(dir.path().join("README.md"), "new docs").unwrap();
        assert!(is_fresh(&metadata).unwrap());

        std::fs::write(dir.path().join("main.go"), "package main // edited").unwrap();
        assert!(!is_fresh(&metadata).unwrap());
    }

    #[test]
    fn test_stale_after_add_remove_rename() {
        let dir = project();

        let metadata = build_metadata(dir.path(), &[Language::Go]).unwrap();
        std::fs::write(dir.path().join("extra.go"), "package main").unwrap();
        assert!(!is_fresh(&metadata).unwrap());

        let metadata = build_metadata(dir.path(), &[Language::Go]).unwrap();
        std::fs::remove_file(dir.path().join("extra.go")).unwrap();
        assert!(!is_fresh(&metadata).unwrap());

        let metadata = build_metadata(dir.path(), &[Language::Go]).unwrap();
        std::fs::rename(dir.path().join("pkg/util.go"), dir.path().join("pkg/helpers.go")).unwrap();
        assert!(!is_fresh(&metadata).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_ignored() {
        let dir = project();
        let metadata = build_metadata(dir.path(), &[Language::Go]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("main.go"), dir.path().join("alias.go")).unwrap();
        assert!(is_fresh(&metadata).unwrap());
    }

    #[test]
    fn test_sidecar_round_trip() {
        let dir = project();
        let store = dir.path().join("index.db");
        assert!(load_metadata(&store).unwrap().is_none());

        let metadata = build_metadata(dir.path(), &[Language::Go]).unwrap();
        save_metadata(&store, &metadata).unwrap();

        assert!(dir.path().join("index.db.meta.json").exists());
        assert_eq!(load_metadata(&store).unwrap(), Some(metadata));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(metadata_path(&store)).unwrap()).unwrap();
        assert_eq!(raw["languages"], serde_json::json!(["go"]));
        assert!(raw["created_at"].is_string());
        assert!(raw["project_root"].is_string());
        assert_eq!(raw["files_hashed"].as_str().unwrap().len(), 64);
    }
}
