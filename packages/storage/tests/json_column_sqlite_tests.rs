// ABOUTME: Integration tests for the JSON column adapters against SQLite
// ABOUTME: Verifies encode/decode through sqlx, including NULL, empty, foreign-typed and malformed values

use lectern_config::DatabaseConfig;
use lectern_storage::{ApiKeysProvided, Database, ModelPreferences};
use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlx::{Row, SqlitePool};

async fn setup_pool() -> SqlitePool {
    let database = Database::connect_and_migrate(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to set up in-memory database");
    database.pool().clone()
}

#[tokio::test]
async fn test_api_keys_round_trip_through_bind() {
    let pool = setup_pool().await;
    let keys: ApiKeysProvided = [("openai", true), ("gemini", false)].into_iter().collect();

    let row = sqlx::query("SELECT ? AS v, typeof(?) AS t")
        .bind(&keys)
        .bind(&keys)
        .fetch_one(&pool)
        .await
        .unwrap();

    let decoded: ApiKeysProvided = row.try_get("v").unwrap();
    let stored_type: String = row.try_get("t").unwrap();

    assert_eq!(decoded, keys);
    assert_eq!(stored_type, "text");
}

#[tokio::test]
async fn test_model_preferences_round_trip_through_bind() {
    let pool = setup_pool().await;
    let mut prefs = ModelPreferences::new();
    prefs.set("openai", "gpt-4", true);
    prefs.set("openai", "gpt-3.5", false);

    let decoded: ModelPreferences = sqlx::query_scalar("SELECT ?")
        .bind(&prefs)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(decoded, prefs);
}

#[tokio::test]
async fn test_empty_mapping_is_stored_as_empty_object() {
    let pool = setup_pool().await;

    let stored: String = sqlx::query_scalar("SELECT ?")
        .bind(ApiKeysProvided::new())
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(stored, "{}");
}

#[rstest]
#[case::null("SELECT NULL AS v")]
#[case::empty_blob("SELECT X'' AS v")]
#[case::empty_text("SELECT '' AS v")]
#[case::json_null("SELECT 'null' AS v")]
#[tokio::test]
async fn test_absent_values_decode_as_empty(#[case] sql: &str) {
    let pool = setup_pool().await;
    let row = sqlx::query(sql).fetch_one(&pool).await.unwrap();

    let keys: ApiKeysProvided = row.try_get("v").unwrap();
    let prefs: ModelPreferences = row.try_get("v").unwrap();

    assert!(keys.is_empty());
    assert!(prefs.is_empty());
}

#[tokio::test]
async fn test_blob_json_decodes() {
    let pool = setup_pool().await;
    let row = sqlx::query("SELECT CAST('{\"xai\": true}' AS BLOB) AS v")
        .fetch_one(&pool)
        .await
        .unwrap();

    let keys: ApiKeysProvided = row.try_get("v").unwrap();

    assert!(keys.has_key("xai"));
}

#[rstest]
#[case::integer("SELECT 42 AS v", "INTEGER")]
#[case::real("SELECT 4.2 AS v", "REAL")]
#[tokio::test]
async fn test_unsupported_column_type_names_the_type(#[case] sql: &str, #[case] type_name: &str) {
    let pool = setup_pool().await;
    let row = sqlx::query(sql).fetch_one(&pool).await.unwrap();

    let err = row.try_get::<ApiKeysProvided, _>("v").unwrap_err();

    assert!(
        err.to_string()
            .contains(&format!("cannot scan {} into ApiKeysProvided", type_name)),
        "unexpected error: {}",
        err
    );
}

#[tokio::test]
async fn test_malformed_json_is_a_decode_error() {
    let pool = setup_pool().await;
    let row = sqlx::query("SELECT 'not-json' AS v")
        .fetch_one(&pool)
        .await
        .unwrap();

    let keys_err = row.try_get::<ApiKeysProvided, _>("v").unwrap_err();
    let prefs_err = row.try_get::<ModelPreferences, _>("v").unwrap_err();

    assert!(keys_err.to_string().contains("failed to decode ApiKeysProvided"));
    assert!(prefs_err.to_string().contains("failed to decode ModelPreferences"));
}
