// ABOUTME: Dead-letter message persistence
// ABOUTME: Stores undeliverable queue messages with their JSON payload and attributes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

pub const DEFAULT_STATUS: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterMessage {
    pub id: String,
    pub subscription_name: String,
    pub message_id: String,
    pub payload: JsonValue,
    pub attributes: Option<JsonValue>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incoming message as received from the queue. Payload and attributes are
/// raw JSON bytes and are validated before they are stored.
#[derive(Debug, Clone)]
pub struct NewDeadLetterMessage {
    pub subscription_name: String,
    pub message_id: String,
    pub payload: Vec<u8>,
    pub attributes: Option<Vec<u8>>,
    pub status: Option<String>,
}

fn validate_json(field: &str, bytes: &[u8]) -> StorageResult<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| StorageError::InvalidInput(format!("{} is not valid UTF-8", field)))?;
    serde_json::from_str::<JsonValue>(text)
        .map_err(|e| StorageError::InvalidInput(format!("{} is not valid JSON: {}", field, e)))?;
    Ok(text.to_string())
}

pub struct DeadLetterStorage {
    pool: SqlitePool,
}

impl DeadLetterStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, message: NewDeadLetterMessage) -> StorageResult<DeadLetterMessage> {
        let payload = validate_json("payload", &message.payload)?;
        // Empty attributes are stored as NULL
        let attributes = match message.attributes.as_deref() {
            Some(bytes) if !bytes.is_empty() => Some(validate_json("attributes", bytes)?),
            _ => None,
        };
        let id = Uuid::new_v4().to_string();
        let status = message
            .status
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());

        debug!(
            "Creating dead letter message {} for subscription {}",
            message.message_id, message.subscription_name
        );

        sqlx::query(
            r#"
            INSERT INTO dead_letter_messages (
                id, subscription_name, message_id, payload, attributes, status
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&message.subscription_name)
        .bind(&message.message_id)
        .bind(&payload)
        .bind(&attributes)
        .bind(&status)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(
                "Failed to create dead letter message for subscription {}: {}",
                message.subscription_name, e
            );
            StorageError::Sqlx(e)
        })?;

        self.get(&id)
            .await?
            .ok_or(StorageError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<DeadLetterMessage>> {
        let row = sqlx::query("SELECT * FROM dead_letter_messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.map(|row| self.row_to_message(&row)).transpose()
    }

    pub async fn list_by_status(&self, status: &str) -> StorageResult<Vec<DeadLetterMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM dead_letter_messages WHERE status = ? ORDER BY created_at, rowid",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(|row| self.row_to_message(row)).collect()
    }

    fn row_to_message(&self, row: &sqlx::sqlite::SqliteRow) -> StorageResult<DeadLetterMessage> {
        let payload: String = row.try_get("payload")?;
        let attributes: Option<String> = row.try_get("attributes")?;

        Ok(DeadLetterMessage {
            id: row.try_get("id")?,
            subscription_name: row.try_get("subscription_name")?,
            message_id: row.try_get("message_id")?,
            payload: serde_json::from_str(&payload)?,
            attributes: attributes
                .map(|attrs| serde_json::from_str(&attrs))
                .transpose()?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
