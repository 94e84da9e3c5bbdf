// ABOUTME: Concurrency tests for user profile updates on a file-backed database
// ABOUTME: Parallel read-modify-write updates must wait for the write lock instead of failing

use std::sync::Arc;

use lectern_config::{DatabaseConfig, Environment};
use lectern_storage::{Database, UserCreateInput, UserStorage};
use tempfile::TempDir;

const USERS: usize = 40;

async fn setup_file_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lectern.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 8,
        environment: Environment::Development,
    };

    let database = Database::connect_and_migrate(&config).await.unwrap();
    (database, temp_dir)
}

async fn create_users(storage: &UserStorage) -> Vec<String> {
    let mut user_ids = Vec::with_capacity(USERS);
    for i in 0..USERS {
        let user_id = format!("user-{}", i);
        storage
            .create_user(&UserCreateInput {
                user_id: user_id.clone(),
                name: format!("User {}", i),
                email: format!("{}@example.com", user_id),
                avatar_url: String::new(),
            })
            .await
            .unwrap();
        user_ids.push(user_id);
    }
    user_ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_key_registrations_all_succeed() {
    let (database, _temp_dir) = setup_file_db().await;
    let storage = Arc::new(UserStorage::new(database.pool().clone()));
    let user_ids = create_users(&storage).await;

    let handles: Vec<_> = user_ids
        .iter()
        .cloned()
        .map(|user_id| {
            let storage = Arc::clone(&storage);
            tokio::spawn(async move { storage.register_api_key(&user_id, "openai").await })
        })
        .collect();

    let mut failures = Vec::new();
    for handle in handles {
        if let Err(e) = handle.await.unwrap() {
            failures.push(e.to_string());
        }
    }
    assert!(failures.is_empty(), "failed registrations: {:?}", failures);

    for user_id in &user_ids {
        let user = storage.get_user(user_id).await.unwrap().unwrap();
        assert!(user.api_keys_provided.has_key("openai"));
        assert!(user.model_preferences.is_enabled("openai", "gpt-4.1"));
    }

    database.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_on_one_user_are_not_lost() {
    let (database, _temp_dir) = setup_file_db().await;
    let storage = Arc::new(UserStorage::new(database.pool().clone()));
    let user_ids = create_users(&storage).await;
    let user_id = user_ids[0].clone();

    let models = ["gpt-5", "gpt-5-mini", "gpt-5-nano", "gpt-4.1-nano"];
    let handles: Vec<_> = models
        .into_iter()
        .map(|model| {
            let storage = Arc::clone(&storage);
            let user_id = user_id.clone();
            tokio::spawn(async move {
                storage
                    .set_model_preference(&user_id, "openai", model, true)
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let user = storage.get_user(&user_id).await.unwrap().unwrap();
    for model in models {
        assert!(user.model_preferences.is_enabled("openai", model), "{}", model);
    }

    database.close().await;
}
