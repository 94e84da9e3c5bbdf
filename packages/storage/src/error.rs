// ABOUTME: Storage error types
// ABOUTME: Unifies driver, migration, column adapter and validation failures

use thiserror::Error;

use crate::json_column::ColumnError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("JSON column error: {0}")]
    Column(#[from] ColumnError),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
