/// Load Module
///
/// Handles storing decoded records into the SQLite database.
use anyhow::{Context, Result};
use num_traits::ToPrimitive;
use sqlx::SqlitePool;

use crate::etl::parsers::hex::AMOUNT_DECIMALS;
use crate::models::{DecodedBetRecord, Ledger};

/// SQLite INTEGER is signed 64-bit
fn to_sql_int(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{} {} does not fit in INTEGER", field, value))
}

/// Amount in 10^-18 base units, as an exact integer string
fn raw_amount(record: &DecodedBetRecord) -> String {
    let (units, _) = record.amount.with_scale(AMOUNT_DECIMALS).into_bigint_and_exponent();
    units.to_string()
}

/// Batch insert records of one ledger within a database transaction
///
/// Uses INSERT OR IGNORE: a record whose tx_hash is already stored is skipped,
/// never updated. Either the whole batch is committed or none of it.
///
/// Returns the number of newly inserted rows.
pub async fn batch_insert_records(pool: &SqlitePool, ledger: Ledger, records: &[DecodedBetRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        r#"
        INSERT OR IGNORE INTO {} (
            timestamp,
            tx_hash,
            from_address,
            to_address,
            token,
            amount,
            amount_raw,
            n_cards,
            bet_id,
            block_number
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        ledger.table()
    );

    // Start a database transaction
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for record in records {
        let result = sqlx::query(&sql)
            .bind(record.timestamp)
            .bind(&record.tx_hash)
            .bind(&record.from_address)
            .bind(&record.to_address)
            .bind(record.token.as_str())
            .bind(record.amount.to_f64().unwrap_or(0.0))
            .bind(raw_amount(record))
            .bind(to_sql_int(record.card_count, "n_cards")?)
            .bind(to_sql_int(record.bet_id, "bet_id")?)
            .bind(to_sql_int(record.block_number, "block_number")?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert {}", record.tx_hash))?;

        inserted += result.rows_affected();
    }

    // Commit the transaction
    tx.commit().await?;

    let inserted = inserted as usize;
    tracing::debug!(
        ledger = %ledger,
        inserted,
        skipped = records.len() - inserted,
        "Batch inserted records"
    );
    Ok(inserted)
}

/// Set the checkpoint row of a ledger
pub async fn upsert_checkpoint(pool: &SqlitePool, ledger: Ledger, block_number: u64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO checkpoints (ledger, last_processed_block, last_update)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT (ledger)
        DO UPDATE SET
            last_processed_block = excluded.last_processed_block,
            last_update = CURRENT_TIMESTAMP
        "#,
    )
    .bind(ledger.as_str())
    .bind(to_sql_int(block_number, "checkpoint")?)
    .execute(pool)
    .await?;

    Ok(())
}
