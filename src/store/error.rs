//! Symbol store errors.

use thiserror::Error;

/// Failure to decode a stored blob.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("decompression failed: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] protobuf::Error),

    #[error("invalid occurrence range {0:?}")]
    InvalidRange(Vec<i32>),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("index corrupted: {0}")]
    IndexCorrupted(#[source] DecodeError),

    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("store not found: {0}")]
    StoreNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<DecodeError> for QueryError {
    fn from(e: DecodeError) -> Self {
        QueryError::IndexCorrupted(e)
    }
}
