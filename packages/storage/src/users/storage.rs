// ABOUTME: User profile storage layer using SQLite
// ABOUTME: Handles profile upserts and full-replacement updates of the JSON provider columns

use lectern_models::{Provider, REGISTRY};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::types::{ModelToggle, ProviderModels, User, UserCreateInput};
use crate::error::{StorageError, StorageResult};
use crate::json_column::{ApiKeysProvided, ModelPreferences};

const SELECT_USER: &str = r#"
    SELECT user_id, name, email, avatar_url, api_keys_provided, model_preferences,
           created_at, updated_at
    FROM user_profiles
    WHERE user_id = ?
"#;

async fn fetch_user(conn: &mut SqliteConnection, user_id: &str) -> StorageResult<Option<User>> {
    sqlx::query_as::<_, User>(SELECT_USER)
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(StorageError::Sqlx)
}

fn parse_provider(provider: &str) -> StorageResult<Provider> {
    provider
        .parse::<Provider>()
        .map_err(|e| StorageError::InvalidInput(e.to_string()))
}

fn ensure_enabled(provider: Provider) -> StorageResult<()> {
    if REGISTRY.is_disabled(provider) {
        return Err(StorageError::InvalidInput(format!(
            "Provider {} is currently disabled",
            provider
        )));
    }
    Ok(())
}

pub struct UserStorage {
    pool: SqlitePool,
}

impl UserStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a profile, or refresh name/email/avatar of an existing one.
    /// Provider mappings of an existing profile are left as they are.
    pub async fn create_user(&self, input: &UserCreateInput) -> StorageResult<User> {
        if input.user_id.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "User id cannot be empty".to_string(),
            ));
        }
        if !input.email.contains('@') {
            return Err(StorageError::InvalidInput(format!(
                "Invalid email address: {}",
                input.email
            )));
        }

        debug!("Creating or updating user: {}", input.user_id);

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                user_id, name, email, avatar_url, api_keys_provided, model_preferences
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                avatar_url = excluded.avatar_url,
                updated_at = datetime('now', 'utc')
            "#,
        )
        .bind(&input.user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.avatar_url)
        .bind(ApiKeysProvided::new())
        .bind(ModelPreferences::new())
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        let user = fetch_user(&mut tx, &input.user_id)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(input.user_id.clone()))?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> StorageResult<Option<User>> {
        debug!("Fetching user: {}", user_id);

        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        fetch_user(&mut conn, user_id).await
    }

    pub async fn replace_api_keys_provided(
        &self,
        user_id: &str,
        api_keys_provided: &ApiKeysProvided,
    ) -> StorageResult<()> {
        debug!("Replacing API key flags for user: {}", user_id);

        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET api_keys_provided = ?, updated_at = datetime('now', 'utc')
            WHERE user_id = ?
            "#,
        )
        .bind(api_keys_provided)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    pub async fn replace_model_preferences(
        &self,
        user_id: &str,
        model_preferences: &ModelPreferences,
    ) -> StorageResult<()> {
        debug!("Replacing model preferences for user: {}", user_id);

        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET model_preferences = ?, updated_at = datetime('now', 'utc')
            WHERE user_id = ?
            "#,
        )
        .bind(model_preferences)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Mark a provider key as stored. The first time a provider is
    /// registered its default models are enabled in the same transaction.
    pub async fn register_api_key(&self, user_id: &str, provider: &str) -> StorageResult<User> {
        let provider = parse_provider(provider)?;
        ensure_enabled(provider)?;

        let mut newly_added = false;
        let user = self
            .update_mappings(user_id, |keys, prefs| {
                if !keys.has_key(provider.as_str()) {
                    newly_added = true;
                    for model in REGISTRY.default_models(provider) {
                        prefs.set(provider.as_str(), model.as_str(), true);
                    }
                }
                keys.set(provider.as_str(), true);
            })
            .await?;

        if newly_added {
            info!(
                "Registered new {} key for user {}, enabled {} default models",
                provider,
                user_id,
                REGISTRY.default_models(provider).len()
            );
        } else {
            debug!("Refreshed existing {} key for user {}", provider, user_id);
        }

        Ok(user)
    }

    /// Clear a provider key flag. Model toggles stay stored, but adding the
    /// key again counts as a first registration and re-enables the defaults.
    pub async fn remove_api_key(&self, user_id: &str, provider: &str) -> StorageResult<User> {
        let provider = parse_provider(provider)?;
        debug!("Removing {} key flag for user: {}", provider, user_id);

        self.update_mappings(user_id, |keys, _| keys.set(provider.as_str(), false))
            .await
    }

    pub async fn set_model_preference(
        &self,
        user_id: &str,
        provider: &str,
        model: &str,
        enabled: bool,
    ) -> StorageResult<User> {
        let provider = parse_provider(provider)?;
        ensure_enabled(provider)?;
        if !REGISTRY.has_model(provider, model) {
            return Err(StorageError::InvalidInput(format!(
                "Unsupported model for provider {}: {}",
                provider, model
            )));
        }

        debug!(
            "Setting model {}/{} enabled={} for user: {}",
            provider, model, enabled, user_id
        );

        self.update_mappings(user_id, |_, prefs| {
            prefs.set(provider.as_str(), model, enabled)
        })
        .await
    }

    /// Providers the user holds a key for, in display order, with the
    /// enabled state of every curated model.
    pub async fn list_models(&self, user_id: &str) -> StorageResult<Vec<ProviderModels>> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(user_id.to_string()))?;

        let listing = REGISTRY
            .providers()
            .filter(|provider| user.api_keys_provided.has_key(provider.as_str()))
            .map(|provider| ProviderModels {
                provider,
                models: REGISTRY
                    .models(provider)
                    .iter()
                    .map(|model| ModelToggle {
                        id: model.id.clone(),
                        name: model.name.clone(),
                        enabled: user
                            .model_preferences
                            .is_enabled(provider.as_str(), &model.id),
                    })
                    .collect(),
            })
            .collect();

        Ok(listing)
    }

    /// Read both mappings, let `update` modify them, and write them back
    /// whole inside one transaction.
    async fn update_mappings<F>(&self, user_id: &str, update: F) -> StorageResult<User>
    where
        F: FnOnce(&mut ApiKeysProvided, &mut ModelPreferences),
    {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        // Write first so the transaction holds the write lock before reading.
        let touched = sqlx::query(
            "UPDATE user_profiles SET updated_at = datetime('now', 'utc') WHERE user_id = ?",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        if touched.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(user_id.to_string()));
        }

        let mut user = fetch_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(user_id.to_string()))?;

        update(&mut user.api_keys_provided, &mut user.model_preferences);

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET api_keys_provided = ?, model_preferences = ?
            WHERE user_id = ?
            "#,
        )
        .bind(&user.api_keys_provided)
        .bind(&user.model_preferences)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        let updated = fetch_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(user_id.to_string()))?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        Ok(updated)
    }
}
