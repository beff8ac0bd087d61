//! Database-specific error types and conversions.

use maxcloud_core::Error;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("invalid database url: {0}")]
    BadUrl(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Error::Database(err.to_string())
    }
}
