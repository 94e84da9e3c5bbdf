// ABOUTME: User profile module
// ABOUTME: Provides types and storage for user profiles and their provider settings

pub mod storage;
pub mod types;

pub use storage::UserStorage;
pub use types::*;
