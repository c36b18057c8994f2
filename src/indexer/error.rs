//! Indexer download and execution errors.

use thiserror::Error;

use super::Language;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("no indexer registered for {0}")]
    UnsupportedLanguage(Language),

    #[error("unsupported platform for {indexer}: {os}/{arch}")]
    UnsupportedPlatform {
        indexer: String,
        os: String,
        arch: String,
    },

    #[error("asset {asset} does not match pinned version {version}")]
    VersionMismatch { asset: String, version: String },

    #[error("archive {asset} has no entry named {executable}")]
    MissingArchiveEntry { asset: String, executable: String },

    #[error("invalid asset url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{indexer} exited with {status}:\n{output}")]
    IndexerFailed {
        indexer: String,
        status: String,
        output: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
