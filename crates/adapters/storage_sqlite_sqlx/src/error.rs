//! Storage-specific error type wrapping sqlx errors.

use hush_domain::error::HushError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to (de)serialize a stored rule.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failed to prepare the database directory.
    #[error("database directory error")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for HushError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
