/// RBS Ledger Ingest
///
/// Ingests bets and claims of the on-chain card game into SQLite.
use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use rbs_ingest::cli::Cli;
use rbs_ingest::config::LedgerProfile;
use rbs_ingest::db::Database;
use rbs_ingest::models::{Ledger, LedgerStats};
use rbs_ingest::pipeline::Pipeline;
use rbs_ingest::rpc::HypersyncClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    cli.validate().context("Invalid arguments")?;

    let env_var = |key: &str| env::var(key).ok();

    if cli.stats {
        let database_url = cli.database_url(env_var);
        let database = Database::open_existing(&database_url)
            .await
            .with_context(|| format!("No ledger database at {}", database_url))?;

        for ledger in [Ledger::Bets, Ledger::Claims] {
            let stats = database.ledger_stats(ledger).await.context("Failed to load ledger statistics")?;
            print_ledger_stats(&stats);
        }
        return Ok(());
    }

    let contracts = cli.contract_set()?;
    let config = cli.ingest_config(env_var)?;

    println!("🚀 Starting RBS Ledger Ingest ({})...", cli.ledger);

    // Initialize HyperSync client
    let client =
        HypersyncClient::new(config.hypersync_url.clone(), Some(config.bearer_token.clone()), config.request_timeout)
            .context("Failed to create HyperSync client")?;

    // Test connection
    client.test_connection().await.context("Failed to connect to HyperSync")?;

    // Get and display connection info
    let conn_info = client.get_connection_info().await.context("Failed to get connection info")?;

    println!("✅ Connected to: {}", conn_info.endpoint);
    println!("🎯 Chain height: {}", format_number(conn_info.height));
    println!("⏰ Timestamp: {}", conn_info.checked_at.format("%Y-%m-%d %H:%M:%S UTC"));

    // Initialize database connection
    println!("\n💾 Opening SQLite database...");
    let database = Database::new(&config.database_url).await.context("Failed to open SQLite database")?;

    // Test database connection
    database.test_connection().await.context("Database connection test failed")?;

    // Run database migrations
    println!("📋 Running database migrations...");
    database.migrate().await.context("Failed to run database migrations")?;

    println!("✅ Database ready!");

    tracing::info!(ledger = %cli.ledger, "RBS Ledger Ingest initialized successfully");

    // Configure and run the pipeline
    let profile = LedgerProfile::new(cli.ledger, &contracts);
    let pipeline = Pipeline::new(client, database.clone(), profile, cli.pipeline_config(&config));

    let stats = pipeline.run().await.context("Pipeline execution failed")?;

    if stats.records_inserted > 0 {
        let ledger_stats = database.ledger_stats(cli.ledger).await.context("Failed to load ledger statistics")?;
        print_ledger_stats(&ledger_stats);
    }

    println!("\n✨ Ingestion complete! Checkpoint at block {}", format_number(stats.checkpoint_after));

    Ok(())
}

/// Print the summary of one ledger
fn print_ledger_stats(stats: &LedgerStats) {
    println!("\n📊 {} ledger", stats.ledger);
    println!("   📝 Records: {}", format_number(stats.total_records.max(0) as u64));
    println!("   👤 Unique senders: {}", format_number(stats.unique_senders.max(0) as u64));
    println!("   💾 Checkpoint: {}", format_number(stats.checkpoint));

    if let (Some(min), Some(max)) = (stats.min_block, stats.max_block) {
        println!("   📦 Blocks: {} to {}", format_number(min.max(0) as u64), format_number(max.max(0) as u64));
    }
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        println!("   ⏰ From {} to {}", first.format("%Y-%m-%d %H:%M:%S UTC"), last.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    for token in &stats.tokens {
        println!(
            "   💰 {}: {} records, volume {:.4}, average {:.4}",
            token.token,
            format_number(token.count.max(0) as u64),
            token.volume,
            token.average
        );
    }
}

/// Format a number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(174283491), "174,283,491");
    }
}
