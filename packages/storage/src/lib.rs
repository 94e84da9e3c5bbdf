// ABOUTME: Data layer and persistence for Lectern
// ABOUTME: Typed JSON column adapters, user profile storage and dead-letter persistence

pub mod db;
pub mod dead_letter;
pub mod error;
pub mod json_column;
pub mod users;

// Re-export main types for convenience
pub use db::Database;
pub use dead_letter::{DeadLetterMessage, DeadLetterStorage, NewDeadLetterMessage};
pub use error::{StorageError, StorageResult};
pub use json_column::{ApiKeysProvided, ColumnError, ColumnValue, JsonColumn, ModelPreferences};
pub use users::{
    ModelToggle, ProviderModels, User, UserCreateInput, UserResponse, UserStorage,
};
