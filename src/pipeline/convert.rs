//! Convert a merged SCIP index into the SQLite symbol store.
//!
//! The conversion itself is done by an external tool. When a store already
//! exists, the tool writes to `<store>.tmp` and the result is swapped in with
//! a rename, so readers opening the store see either the old or the new file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// SQLite sidecar files that must not outlive their database.
const SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm", "-journal"];

/// Runs `<tool> <subcommand> --output <store> <index>`.
#[derive(Debug, Clone)]
pub struct Converter {
    tool: PathBuf,
    subcommand: String,
}

impl Converter {
    pub fn new(tool: impl Into<PathBuf>, subcommand: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            subcommand: subcommand.into(),
        }
    }

    /// Convert `index_path` into a store at `store_path`, atomically replacing any existing store.
    pub async fn convert(&self, index_path: &Path, store_path: &Path) -> Result<()> {
        if !store_path.exists() {
            return self.run_or_clean_up(index_path, store_path).await;
        }

        let tmp = with_suffix(store_path, ".tmp");
        remove_with_sidecars(&tmp)?;
        self.run_or_clean_up(index_path, &tmp).await?;

        replace_store(&tmp, store_path)?;
        info!(store = %store_path.display(), "replaced existing store");
        Ok(())
    }

    /// Run the tool into `output`, removing whatever it left there on failure.
    async fn run_or_clean_up(&self, index_path: &Path, output: &Path) -> Result<()> {
        let result = self.run_tool(index_path, output).await;
        if result.is_err() {
            if let Err(cleanup) = remove_with_sidecars(output) {
                warn!(path = %output.display(), error = %cleanup, "failed to clean up partial store");
            }
        }
        result
    }

    async fn run_tool(&self, index_path: &Path, output: &Path) -> Result<()> {
        let args: Vec<OsString> = vec![
            self.subcommand.clone().into(),
            "--output".into(),
            output.into(),
            index_path.into(),
        ];
        debug!(tool = %self.tool.display(), ?args, "running converter");

        let result = Command::new(&self.tool)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run converter {}", self.tool.display()))?;

        if !result.status.success() {
            let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&result.stderr));
            bail!(
                "{} {} exited with {}:\n{}",
                self.tool.display(),
                self.subcommand,
                result.status,
                combined
            );
        }

        if !output.exists() {
            bail!("converter produced no store at {}", output.display());
        }
        Ok(())
    }
}

/// `path` with `suffix` appended to its file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn remove_sidecars(path: &Path) -> std::io::Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        remove_if_exists(&with_suffix(path, suffix))?;
    }
    Ok(())
}

fn remove_with_sidecars(path: &Path) -> std::io::Result<()> {
    remove_if_exists(path)?;
    remove_sidecars(path)
}

/// Move `new` over `current`, dropping stale sidecars of both first.
fn replace_store(new: &Path, current: &Path) -> Result<()> {
    remove_sidecars(current)?;
    remove_sidecars(new)?;

    if let Err(e) = std::fs::rename(new, current) {
        // Some platforms refuse to rename over an existing file
        debug!(error = %e, "rename over store failed, removing old store first");
        remove_if_exists(current)?;
        std::fs::rename(new, current).with_context(|| {
            format!("Failed to move {} to {}", new.display(), current.display())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("/a/index.db"), "-wal"),
            PathBuf::from("/a/index.db-wal")
        );
    }

    #[test]
    fn test_replace_store_drops_sidecars() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("index.db");
        let tmp = dir.path().join("index.db.tmp");
        std::fs::write(&store, "old").unwrap();
        std::fs::write(with_suffix(&store, "-wal"), "stale wal").unwrap();
        std::fs::write(with_suffix(&store, "-shm"), "stale shm").unwrap();
        std::fs::write(&tmp, "new").unwrap();
        std::fs::write(with_suffix(&tmp, "-journal"), "journal").unwrap();

        replace_store(&tmp, &store).unwrap();

        assert_eq!(std::fs::read_to_string(&store).unwrap(), "new");
        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(left, vec!["index.db"]);
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-scip");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // Fake converter: `fake-scip expt-convert --output <store> <index>` copies the index
    #[cfg(unix)]
    const COPY_TOOL: &str = r#"[ "$1" = "expt-convert" ] || exit 9
cp "$4" "$3""#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_fresh_store() {
        let dir = tempdir().unwrap();
        let index = dir.path().join("index.scip");
        let store = dir.path().join("index.db");
        std::fs::write(&index, "v1").unwrap();

        let converter = Converter::new(fake_tool(dir.path(), COPY_TOOL), "expt-convert");
        converter.convert(&index, &store).await.unwrap();
        assert_eq!(std::fs::read_to_string(&store).unwrap(), "v1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_replaces_existing_store() {
        let dir = tempdir().unwrap();
        let index = dir.path().join("index.scip");
        let store = dir.path().join("index.db");
        std::fs::write(&store, "v1").unwrap();
        std::fs::write(with_suffix(&store, "-wal"), "stale").unwrap();
        std::fs::write(&index, "v2").unwrap();

        let converter = Converter::new(fake_tool(dir.path(), COPY_TOOL), "expt-convert");
        converter.convert(&index, &store).await.unwrap();

        assert_eq!(std::fs::read_to_string(&store).unwrap(), "v2");
        assert!(!with_suffix(&store, "-wal").exists());
        assert!(!with_suffix(&store, ".tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_convert_keeps_old_store() {
        let dir = tempdir().unwrap();
        let index = dir.path().join("index.scip");
        let store = dir.path().join("index.db");
        std::fs::write(&store, "v1").unwrap();
        std::fs::write(&index, "v2").unwrap();

        let tool = fake_tool(dir.path(), "echo 'half written' > \"$3\"\necho 'bad index' >&2\nexit 1");
        let converter = Converter::new(tool, "expt-convert");
        let err = converter.convert(&index, &store).await.unwrap_err();

        assert!(format!("{err:#}").contains("bad index"));
        assert_eq!(std::fs::read_to_string(&store).unwrap(), "v1");
        assert!(!with_suffix(&store, ".tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_first_convert_leaves_no_store() {
        let dir = tempdir().unwrap();
        let index = dir.path().join("index.scip");
        let store = dir.path().join("index.db");
        std::fs::write(&index, "v1").unwrap();

        let tool = fake_tool(
            dir.path(),
            "echo 'half written' > \"$3\"\necho 'half wal' > \"$3-wal\"\nexit 1",
        );
        let converter = Converter::new(tool, "expt-convert");
        converter.convert(&index, &store).await.unwrap_err();

        assert!(!store.exists());
        assert!(!with_suffix(&store, "-wal").exists());
    }
}
