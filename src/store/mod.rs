//! Symbol store queries.
//!
//! This module provides:
//! - Decoding of compressed occurrence chunks and signature blobs
//! - A bounded cache of resolved symbols
//! - `SymbolIndex`, the read-only query engine over a converted store

mod cache;
mod decode;
mod error;
mod models;
mod symbol_index;

#[cfg(test)]
pub(crate) mod fixtures;

pub use models::Location;
pub use symbol_index::SymbolIndex;
