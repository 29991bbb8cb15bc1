//! Error types for index operations.

use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised by an index backend.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Already indexed: {0}")]
    Conflict(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Document rejected: {0}")]
    Rejected(String),
}

impl IndexError {
    /// Map a sqlx error, separating constraint violations from other failures.
    pub(crate) fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return IndexError::Conflict(format!("{}: {}", context, db.message()));
            }
            if db.is_foreign_key_violation() {
                return IndexError::UnknownProduct(format!("{}: {}", context, db.message()));
            }
        }
        IndexError::DatabaseError(format!("{}: {}", context, err))
    }
}
