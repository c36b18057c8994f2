//! The indexing pipeline.
//!
//! This module provides:
//! - Merging per-language SCIP indexes
//! - Converting a merged index into the symbol store
//! - Freshness metadata for a built store
//! - Lifecycle events and the single-flight `AsyncIndexer`

mod convert;
mod events;
mod merge;
mod metadata;
mod orchestrator;

pub use convert::Converter;
pub use events::{ChannelSink, LogSink};
pub use metadata::{IndexMetadata, is_fresh, load_metadata};
pub use orchestrator::{AsyncIndexer, DefaultPipeline, IndexRequest, IndexStatus};
