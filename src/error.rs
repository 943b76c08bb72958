//! Query error taxonomy.
//!
//! Store and transport failures abort the whole request. Soft inconsistencies
//! (a tombstone for a member that was never confirmed, a listed member with no
//! record) never reach this type; they are logged and the entry is omitted.

use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Cursor, page size or an identifier was rejected before any store access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A store operation failed or ran past the request deadline.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// A lookup that must match at least one entry matched nothing.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl QueryError {
    pub fn invalid(message: impl Into<String>) -> Self {
        QueryError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        QueryError::NotFound(message.into())
    }
}
