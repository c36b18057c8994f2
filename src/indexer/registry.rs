//! Fixed registry of SCIP indexers and their release assets.
//!
//! Asset names follow each project's release naming:
//! ```text
//! scip-go          scip-go_{version}_{os}_{arch}.tar.gz   (goreleaser)
//! scip-typescript  scip-typescript-{version}-{os}-{arch}  (node style)
//! scip-python      scip-python-{version}-{os}-{arch}      (node style)
//! scip-java        scip-java-{version}                    (launcher, any platform)
//! ```

use super::Language;
use super::error::IndexerError;

/// How an indexer project names its per-platform release assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetNaming {
    /// `darwin|linux|windows` and `amd64|arm64`.
    GoReleaser,
    /// `darwin|linux|win` and `x64|arm64`.
    Node,
    /// One asset for every platform.
    Universal,
}

/// A pinned indexer release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerSpec {
    pub language: Language,
    pub name: &'static str,
    pub version: &'static str,
    pub executable: &'static str,
    pub naming: AssetNaming,
    /// Download URL template with `{name}`, `{version}`, `{os}`, `{arch}` placeholders.
    pub url_template: &'static str,
}

const INDEXERS: &[IndexerSpec] = &[
    IndexerSpec {
        language: Language::Go,
        name: "scip-go",
        version: "0.1.26",
        executable: "scip-go",
        naming: AssetNaming::GoReleaser,
        url_template: "https://github.com/sourcegraph/scip-go/releases/download/v{version}/scip-go_{version}_{os}_{arch}.tar.gz",
    },
    IndexerSpec {
        language: Language::TypeScript,
        name: "scip-typescript",
        version: "0.3.15",
        executable: "scip-typescript",
        naming: AssetNaming::Node,
        url_template: "https://github.com/sourcegraph/scip-typescript/releases/download/v{version}/scip-typescript-{version}-{os}-{arch}",
    },
    IndexerSpec {
        language: Language::Python,
        name: "scip-python",
        version: "0.6.6",
        executable: "scip-python",
        naming: AssetNaming::Node,
        url_template: "https://github.com/sourcegraph/scip-python/releases/download/v{version}/scip-python-{version}-{os}-{arch}",
    },
    IndexerSpec {
        language: Language::Java,
        name: "scip-java",
        version: "0.10.4",
        executable: "scip-java",
        naming: AssetNaming::Universal,
        url_template: "https://github.com/sourcegraph/scip-java/releases/download/v{version}/scip-java-{version}",
    },
];

/// Look up the pinned indexer for a language.
pub fn indexer_for(language: Language) -> Result<&'static IndexerSpec, IndexerError> {
    INDEXERS
        .iter()
        .find(|pinned| pinned.language == language)
        .ok_or(IndexerError::UnsupportedLanguage(language))
}

impl IndexerSpec {
    /// Resolve the platform-specific (os, arch) pair for this indexer's naming scheme.
    pub fn platform(&self, os: &str, arch: &str) -> Result<(&'static str, &'static str), IndexerError> {
        let unsupported = || IndexerError::UnsupportedPlatform {
            indexer: self.name.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os = match (self.naming, os) {
            (AssetNaming::Universal, _) => "any",
            (_, "macos") => "darwin",
            (_, "linux") => "linux",
            (AssetNaming::GoReleaser, "windows") => "windows",
            (AssetNaming::Node, "windows") => "win",
            _ => return Err(unsupported()),
        };

        let arch = match (self.naming, arch) {
            (AssetNaming::Universal, _) => "any",
            (AssetNaming::GoReleaser, "x86_64") => "amd64",
            (AssetNaming::Node, "x86_64") => "x64",
            (_, "aarch64") => "arm64",
            _ => return Err(unsupported()),
        };

        Ok((os, arch))
    }

    /// Resolve the download URL for the given platform.
    pub fn asset_url(&self, os: &str, arch: &str) -> Result<String, IndexerError> {
        let (os, arch) = self.platform(os, arch)?;
        Ok(self
            .url_template
            .replace("{name}", self.name)
            .replace("{version}", self.version)
            .replace("{os}", os)
            .replace("{arch}", arch))
    }

    /// Resolve the download URL for the running platform.
    pub fn current_asset_url(&self) -> Result<String, IndexerError> {
        self.asset_url(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Executable file name on the running platform.
    pub fn executable_file_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.executable)
        } else {
            self.executable.to_string()
        }
    }
}

/// The file name portion of an asset URL.
pub fn asset_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Reject assets whose file name does not carry the pinned version.
pub fn validate_asset_version(url: &str, version: &str) -> Result<(), IndexerError> {
    let asset = asset_file_name(url);
    if asset.contains(version) {
        Ok(())
    } else {
        Err(IndexerError::VersionMismatch {
            asset: asset.to_string(),
            version: version.to_string(),
        })
    }
}

/// Whether an asset is a gzipped tarball that needs extraction.
pub fn is_tarball(url: &str) -> bool {
    let asset = asset_file_name(url);
    asset.ends_with(".tar.gz") || asset.ends_with(".tgz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_is_registered() {
        for lang in Language::ALL {
            let pinned = indexer_for(lang).unwrap();
            assert_eq!(pinned.language, lang);
        }
    }

    #[test]
    fn test_go_asset_url() {
        let pinned = indexer_for(Language::Go).unwrap();
        let url = pinned.asset_url("linux", "x86_64").unwrap();
        assert_eq!(
            url,
            "https://github.com/sourcegraph/scip-go/releases/download/v0.1.26/scip-go_0.1.26_linux_amd64.tar.gz"
        );
        assert!(is_tarball(&url));
        validate_asset_version(&url, pinned.version).unwrap();
    }

    #[test]
    fn test_node_style_asset_url() {
        let pinned = indexer_for(Language::TypeScript).unwrap();
        let url = pinned.asset_url("windows", "x86_64").unwrap();
        assert!(url.ends_with("/scip-typescript-0.3.15-win-x64"));
        validate_asset_version(&url, pinned.version).unwrap();
        assert!(!is_tarball(&url));
    }

    #[test]
    fn test_unsupported_platform() {
        let pinned = indexer_for(Language::Go).unwrap();
        let err = pinned.asset_url("freebsd", "x86_64").unwrap_err();
        assert!(matches!(err, IndexerError::UnsupportedPlatform { .. }));

        // Universal assets ignore the platform entirely
        let java = indexer_for(Language::Java).unwrap();
        assert!(java.asset_url("freebsd", "riscv64").is_ok());
    }

    #[test]
    fn test_version_validation() {
        // A template that lost its version placeholder resolves to a versionless asset
        let err = validate_asset_version("https://example.com/dl/scip-python-linux-x64", "0.6.6")
            .unwrap_err();
        assert!(matches!(err, IndexerError::VersionMismatch { .. }));

        // The version must appear in the file name, not just the directory
        assert!(validate_asset_version("https://example.com/v0.6.6/scip-python", "0.6.6").is_err());
    }

    #[test]
    fn test_asset_file_name() {
        assert_eq!(asset_file_name("https://x.io/a/b/tool.tgz?token=1"), "tool.tgz");
        assert_eq!(asset_file_name("tool"), "tool");
    }
}
