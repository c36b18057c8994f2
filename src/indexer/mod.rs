//! SCIP indexer management.
//!
//! This module provides:
//! - Language detection over a project tree
//! - A pinned registry of per-language SCIP indexers
//! - Downloading and installing indexer binaries
//! - Running an indexer to produce a per-language index file

mod download;
mod error;
mod language;
mod registry;
mod runner;

pub use download::IndexerManager;
pub use error::IndexerError;
pub use language::{Language, detect_languages};
pub(crate) use language::is_skipped_dir;
pub use registry::indexer_for;
