// ABOUTME: Database connection and migration bootstrap
// ABOUTME: Builds the SQLite pool from DatabaseConfig and applies embedded migrations

use std::str::FromStr;

use lectern_config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::StorageResult;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        debug!(
            "Connecting to database with max {} connections",
            config.max_connections
        );

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!("Database connection established ({:?})", config.environment);
        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date in one step
    pub async fn connect_and_migrate(config: &DatabaseConfig) -> StorageResult<Self> {
        let database = Self::connect(config).await?;
        database.migrate().await?;
        Ok(database)
    }

    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
