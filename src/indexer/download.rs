//! Indexer binary management: resolve, download, extract and install.
//!
//! Installed binaries live under the bin directory, one per pinned release:
//! ```text
//! {bin_dir}/{name}/{version}/{executable}
//! ```

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use reqwest::Client;
use tar::Archive;
use tracing::{debug, info};
use url::Url;

use super::Language;
use super::error::IndexerError;
use super::registry::{
    IndexerSpec, asset_file_name, indexer_for, is_tarball, validate_asset_version,
};

/// Resolves, downloads and runs per-language indexers.
pub struct IndexerManager {
    bin_dir: PathBuf,
    client: Client,
    /// Per-language override: a local executable path or an asset URL.
    overrides: HashMap<Language, String>,
}

impl IndexerManager {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            client: Client::new(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<Language, String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Install location of a pinned indexer release.
    pub fn install_path(&self, pinned: &IndexerSpec) -> PathBuf {
        self.bin_dir
            .join(pinned.name)
            .join(pinned.version)
            .join(pinned.executable_file_name())
    }

    /// Return the local executable for `language`, downloading it on first use.
    pub async fn ensure_indexer(&self, language: Language) -> Result<PathBuf, IndexerError> {
        if let Some(local) = self.local_override(language) {
            debug!(language = %language, path = %local.display(), "using local indexer override");
            return Ok(local);
        }

        let pinned = indexer_for(language)?;
        let path = self.install_path(pinned);
        if path.is_file() {
            return Ok(path);
        }

        self.download_indexer(language).await
    }

    /// Download and install the pinned indexer for `language`.
    pub async fn download_indexer(&self, language: Language) -> Result<PathBuf, IndexerError> {
        let pinned = indexer_for(language)?;
        let url = match self.overrides.get(&language) {
            Some(url) => url.clone(),
            None => pinned.current_asset_url()?,
        };
        validate_asset_version(&url, pinned.version)?;

        info!(indexer = pinned.name, version = pinned.version, url = %url, "downloading indexer");
        let body = self.fetch(&url).await?;

        let binary = if is_tarball(&url) {
            extract_executable(&body, pinned.executable, &url)?
        } else {
            body
        };

        let dest = self.install_path(pinned);
        install_executable(&binary, &dest)?;

        info!(indexer = pinned.name, path = %dest.display(), bytes = binary.len(), "indexer installed");
        Ok(dest)
    }

    /// An override that names an existing local file rather than a URL.
    fn local_override(&self, language: Language) -> Option<PathBuf> {
        let value = self.overrides.get(&language)?;
        if Url::parse(value).is_ok_and(|u| u.scheme().len() > 1) {
            return None;
        }
        let path = PathBuf::from(value);
        path.is_file().then_some(path)
    }

    /// Fetch an asset over HTTP(S), or read it directly for `file://` URLs.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IndexerError> {
        let parsed = Url::parse(url).map_err(|e| IndexerError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "file" => {
                let path = parsed.to_file_path().map_err(|_| IndexerError::InvalidUrl {
                    url: url.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                Ok(tokio::fs::read(&path).await?)
            }
            "http" | "https" => {
                let response = self.client.get(parsed).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            other => Err(IndexerError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", other),
            }),
        }
    }
}

/// Pull the named executable out of a gzipped tarball.
fn extract_executable(data: &[u8], executable: &str, asset: &str) -> Result<Vec<u8>, IndexerError> {
    let decoder = GzDecoder::new(data);
    let mut archive = Archive::new(decoder);
    let windows_name = format!("{}.exe", executable);

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = {
            let path = entry.path()?;
            path.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned)
        };
        let Some(name) = name else {
            continue;
        };
        if name != executable && name != windows_name {
            continue;
        }

        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        debug!(entry = %name, bytes = content.len(), "extracted indexer from archive");
        return Ok(content);
    }

    Err(IndexerError::MissingArchiveEntry {
        asset: asset_file_name(asset).to_string(),
        executable: executable.to_string(),
    })
}

/// Write through a temp file in the destination directory, mark it executable, rename into place.
fn install_executable(binary: &[u8], dest: &Path) -> Result<(), IndexerError> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(binary)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755))?;
    }

    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tarball(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append_data(&mut header, path, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn file_url(path: &Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[test]
    fn test_extract_executable() {
        let data = tarball(&[
            ("LICENSE", "mit"),
            ("scip-go_0.1.26/scip-go", "#!binary"),
        ]);
        let bin = extract_executable(&data, "scip-go", "scip-go_0.1.26.tar.gz").unwrap();
        assert_eq!(bin, b"#!binary");
    }

    #[test]
    fn test_extract_executable_with_exe_suffix() {
        let data = tarball(&[("scip-go.exe", "MZ")]);
        let bin = extract_executable(&data, "scip-go", "scip-go.tar.gz").unwrap();
        assert_eq!(bin, b"MZ");
    }

    #[test]
    fn test_extract_missing_entry() {
        let data = tarball(&[("README.md", "docs")]);
        let err = extract_executable(&data, "scip-go", "scip-go.tar.gz").unwrap_err();
        assert!(matches!(err, IndexerError::MissingArchiveEntry { .. }));
    }

    #[tokio::test]
    async fn test_download_tarball_from_file_url() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("scip-go_0.1.26_linux_amd64.tar.gz");
        std::fs::write(&asset, tarball(&[("scip-go", "#!/bin/sh\necho ok\n")])).unwrap();

        let manager = IndexerManager::new(dir.path().join("bin"))
            .with_overrides(HashMap::from([(Language::Go, file_url(&asset))]));

        let path = manager.ensure_indexer(Language::Go).await.unwrap();
        assert_eq!(path, manager.install_path(indexer_for(Language::Go).unwrap()));
        assert_eq!(std::fs::read(&path).unwrap(), b"#!/bin/sh\necho ok\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        // Second call finds the installed binary without touching the asset
        std::fs::remove_file(&asset).unwrap();
        assert_eq!(manager.ensure_indexer(Language::Go).await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_download_plain_binary() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("scip-python-0.6.6-linux-x64");
        std::fs::write(&asset, b"python indexer").unwrap();

        let manager = IndexerManager::new(dir.path().join("bin"))
            .with_overrides(HashMap::from([(Language::Python, file_url(&asset))]));

        let path = manager.download_indexer(Language::Python).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"python indexer");
    }

    #[tokio::test]
    async fn test_download_rejects_version_mismatch() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("scip-go_9.9.9_linux_amd64.tar.gz");
        std::fs::write(&asset, tarball(&[("scip-go", "old")])).unwrap();

        let manager = IndexerManager::new(dir.path().join("bin"))
            .with_overrides(HashMap::from([(Language::Go, file_url(&asset))]));

        let err = manager.download_indexer(Language::Go).await.unwrap_err();
        assert!(matches!(err, IndexerError::VersionMismatch { .. }));
        assert!(!manager.install_path(indexer_for(Language::Go).unwrap()).exists());
    }

    #[tokio::test]
    async fn test_local_path_override_skips_download() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("my-scip-java");
        std::fs::write(&local, b"launcher").unwrap();

        let manager = IndexerManager::new(dir.path().join("bin")).with_overrides(HashMap::from([(
            Language::Java,
            local.to_string_lossy().to_string(),
        )]));

        assert_eq!(manager.ensure_indexer(Language::Java).await.unwrap(), local);
    }
}
