/// Database Module
///
/// This module handles all SQLite database operations including:
/// - Connection pool management
/// - Schema migrations
/// - The record store used by the pipeline (records + checkpoint)
/// - Read-only statistics for the stats report
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::etl::load;
use crate::models::{DecodedBetRecord, Ledger, LedgerStats, TokenStats};

/// Persistence the ingestion pipeline needs
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Last fully processed block (exclusive end) of the ledger, 0 if never set
    async fn get_checkpoint(&self, ledger: Ledger) -> Result<u64>;

    async fn update_checkpoint(&self, ledger: Ledger, block_number: u64) -> Result<()>;

    /// Insert records, skipping tx hashes already stored. Returns the number of new rows.
    async fn insert_batch(&self, ledger: Ledger, records: &[DecodedBetRecord]) -> Result<usize>;
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool, creating the database file if needed
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, true).await
    }

    /// Open a database that must already exist, for read-only reporting
    pub async fn open_existing(database_url: &str) -> Result<Self> {
        Self::connect(database_url, false).await
    }

    async fn connect(database_url: &str, create_if_missing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid SQLite URL: {}", database_url))?
            .create_if_missing(create_if_missing);

        // Every in-memory connection is a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        Ok(Self { pool })
    }

    /// Open and migrate in one step
    pub async fn init(database_url: &str) -> Result<Self> {
        let database = Self::new(database_url).await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("Failed to run database migrations")?;

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.context("Database connection test failed")?;

        Ok(())
    }

    /// Number of stored records of a ledger
    pub async fn count_records(&self, ledger: Ledger) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", ledger.table()))
            .fetch_one(&self.pool)
            .await
            .context("Failed to count records")?;

        Ok(count)
    }

    /// Summary statistics of a ledger
    pub async fn ledger_stats(&self, ledger: Ledger) -> Result<LedgerStats> {
        let table = ledger.table();

        let (total_records, unique_senders, first_timestamp, last_timestamp, min_block, max_block) =
            sqlx::query_as::<_, (i64, i64, Option<DateTime<Utc>>, Option<DateTime<Utc>>, Option<i64>, Option<i64>)>(
                &format!(
                    r#"
                    SELECT
                        COUNT(*),
                        COUNT(DISTINCT from_address),
                        MIN(timestamp),
                        MAX(timestamp),
                        MIN(block_number),
                        MAX(block_number)
                    FROM {}
                    "#,
                    table
                ),
            )
            .fetch_one(&self.pool)
            .await
            .context("Failed to load ledger totals")?;

        let tokens = sqlx::query_as::<_, TokenStats>(&format!(
            r#"
            SELECT
                token,
                COUNT(*) AS count,
                COALESCE(SUM(amount), 0.0) AS volume,
                COALESCE(AVG(amount), 0.0) AS average
            FROM {}
            GROUP BY token
            ORDER BY volume DESC
            "#,
            table
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to load token statistics")?;

        Ok(LedgerStats {
            ledger,
            total_records,
            unique_senders,
            first_timestamp,
            last_timestamp,
            min_block,
            max_block,
            checkpoint: self.get_checkpoint(ledger).await?,
            tokens,
        })
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn get_checkpoint(&self, ledger: Ledger) -> Result<u64> {
        let block = sqlx::query_scalar::<_, i64>("SELECT last_processed_block FROM checkpoints WHERE ledger = ?")
            .bind(ledger.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read checkpoint")?;

        Ok(block.map(|b| b.max(0) as u64).unwrap_or(0))
    }

    async fn update_checkpoint(&self, ledger: Ledger, block_number: u64) -> Result<()> {
        load::upsert_checkpoint(&self.pool, ledger, block_number).await.context("Failed to update checkpoint")?;

        tracing::debug!(ledger = %ledger, block_number, "Checkpoint updated");
        Ok(())
    }

    async fn insert_batch(&self, ledger: Ledger, records: &[DecodedBetRecord]) -> Result<usize> {
        load::batch_insert_records(&self.pool, ledger, records).await
    }
}
