/// CLI Module
///
/// Command-line interface configuration using clap.
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ContractSet, IngestConfig, DEFAULT_DATABASE_URL, DEFAULT_HYPERSYNC_URL};
use crate::models::Ledger;
use crate::pipeline::PipelineConfig;

/// RBS Ledger Ingest - on-chain wager ETL
///
/// Fetch bet and claim transactions of the card game from HyperSync and store them in SQLite
#[derive(Parser, Debug)]
#[command(name = "rbs-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ledger to ingest
    #[arg(short = 'l', long, value_enum, default_value = "bets")]
    pub ledger: Ledger,

    /// First block to fetch (defaults to the stored checkpoint)
    #[arg(short = 's', long, value_name = "BLOCK")]
    pub start_block: Option<u64>,

    /// Stop before this block (defaults to the chain height at startup)
    #[arg(short = 'e', long, value_name = "BLOCK")]
    pub end_block: Option<u64>,

    /// Reprocess from block 0 instead of resuming from the checkpoint
    #[arg(long, conflicts_with = "start_block")]
    pub full: bool,

    /// Print store statistics and exit
    #[arg(long)]
    pub stats: bool,

    /// Database connection URL (overrides DATABASE_URL env var)
    #[arg(short = 'd', long, value_name = "URL")]
    pub database_url: Option<String>,

    /// HyperSync endpoint URL (overrides HYPERSYNC_URL env var)
    #[arg(short = 'u', long, value_name = "URL")]
    pub hypersync_url: Option<String>,

    /// JSON file overriding contract addresses, selectors and topics
    #[arg(short = 'c', long, value_name = "FILE")]
    pub contracts: Option<PathBuf>,

    /// Blocks per window (defaults per ledger)
    #[arg(short = 'w', long, value_name = "BLOCKS")]
    pub window_size: Option<u64>,

    /// Concurrent lane fetches within a window
    #[arg(long, value_name = "COUNT", default_value = "2")]
    pub concurrency: usize,

    /// Maximum number of attempts per fetch
    #[arg(long, value_name = "COUNT", default_value = "3")]
    pub max_retries: usize,

    /// Retry delay in seconds
    #[arg(long, value_name = "SECONDS", default_value = "2")]
    pub retry_delay: u64,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value = "60")]
    pub timeout: u64,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_block, self.end_block) {
            if start > end {
                anyhow::bail!("Start block ({}) must be less than or equal to end block ({})", start, end);
            }
        }

        if self.window_size == Some(0) {
            anyhow::bail!("Window size must be greater than 0");
        }

        if self.concurrency == 0 {
            anyhow::bail!("Concurrency must be greater than 0");
        }

        if self.max_retries == 0 {
            anyhow::bail!("Max retries must be greater than 0");
        }

        if self.timeout == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        Ok(())
    }

    /// First block of the run: explicit start, 0 for a full run, otherwise the checkpoint
    pub fn start_override(&self) -> Option<u64> {
        if self.full {
            Some(0)
        } else {
            self.start_block
        }
    }

    /// Contract set from `--contracts`, or the built-in deployment
    pub fn contract_set(&self) -> Result<ContractSet> {
        match &self.contracts {
            Some(path) => ContractSet::from_file(path),
            None => Ok(ContractSet::default()),
        }
    }

    pub fn database_url(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.database_url.clone().or_else(|| env("DATABASE_URL")).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    /// Resolve runtime settings: flag, then environment, then default
    pub fn ingest_config(&self, env: impl Fn(&str) -> Option<String>) -> Result<IngestConfig> {
        let bearer_token = env("HYPERSYNC_BEARER_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("HYPERSYNC_BEARER_TOKEN not found in environment. Please check your .env file")?;

        let hypersync_url = self
            .hypersync_url
            .clone()
            .or_else(|| env("HYPERSYNC_URL"))
            .unwrap_or_else(|| DEFAULT_HYPERSYNC_URL.to_string());

        Ok(IngestConfig {
            hypersync_url,
            bearer_token,
            database_url: self.database_url(&env),
            window_size: self.window_size.unwrap_or_else(|| self.ledger.default_window_size()),
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay),
            request_timeout: Duration::from_secs(self.timeout),
        })
    }

    pub fn pipeline_config(&self, ingest: &IngestConfig) -> PipelineConfig {
        PipelineConfig {
            start_block: self.start_override(),
            end_block: self.end_block,
            window_size: ingest.window_size,
            concurrency: ingest.concurrency,
            max_retries: ingest.max_retries,
            retry_delay: ingest.retry_delay,
        }
    }
}
