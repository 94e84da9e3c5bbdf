// ABOUTME: User profile type definitions
// ABOUTME: Row model, create input and API response shapes for user profiles

use chrono::{DateTime, Utc};
use lectern_models::Provider;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::json_column::{ApiKeysProvided, ModelPreferences};

/// Row of the `user_profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub api_keys_provided: ApiKeysProvided,
    pub model_preferences: ModelPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreateInput {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub api_keys_provided: ApiKeysProvided,
    pub model_preferences: ModelPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            api_keys_provided: user.api_keys_provided,
            model_preferences: user.model_preferences,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelToggle {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

/// A provider the user holds a key for, with the enabled state of each curated model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderModels {
    pub provider: Provider,
    pub models: Vec<ModelToggle>,
}
