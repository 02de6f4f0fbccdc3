/// Pipeline Module
///
/// Orchestrates one ingestion run over a block range: Fetch → Classify → Decode → Commit → Checkpoint,
/// one window at a time, with statistics tracking.
use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::config::LedgerProfile;
use crate::cursor::{BlockRangeCursor, Window};
use crate::db::RecordStore;
use crate::etl::extract::{extract_window, RetryPolicy};
use crate::etl::transform::transform_window;
use crate::rpc::ChainSource;

/// Pipeline execution statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub start_block: u64,
    pub target_block: u64,
    pub checkpoint_before: u64,
    pub checkpoint_after: u64,
    pub windows_processed: usize,
    pub empty_windows: usize,
    pub lane_retries: usize,
    pub items_past_end: usize,
    pub transactions_fetched: usize,
    pub logs_fetched: usize,
    pub failed_status: usize,
    pub missing_core_event: usize,
    pub missing_timestamp: usize,
    pub records_decoded: usize,
    pub decode_anomalies: usize,
    pub records_inserted: usize,
    pub duplicates_skipped: usize,
    pub elapsed_time: Duration,
    /// Set when the run stopped early
    pub error: Option<PipelineError>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks the checkpoint moved forward by during the run
    pub fn blocks_advanced(&self) -> u64 {
        self.checkpoint_after.saturating_sub(self.checkpoint_before)
    }

    pub fn blocks_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.blocks_advanced() as f64 / secs
        }
    }

    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_inserted as f64 / secs
        }
    }
}

/// Pipeline error with context
#[derive(Debug, Clone)]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub block: Option<u64>,
    pub message: String,
}

/// Stages that can fail. Classification and decoding never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetch,
    Commit,
    Checkpoint,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Fetch => write!(f, "Fetch"),
            PipelineStage::Commit => write!(f, "Commit"),
            PipelineStage::Checkpoint => write!(f, "Checkpoint"),
        }
    }
}

/// Configuration for pipeline execution
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Overrides the stored checkpoint as the first block
    pub start_block: Option<u64>,
    /// Exclusive; overrides the chain height snapshot, capped by it
    pub end_block: Option<u64>,
    pub window_size: u64,
    pub concurrency: usize,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_block: None,
            end_block: None,
            window_size: 10_000,
            concurrency: 2,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Main ingestion pipeline
pub struct Pipeline<C, S> {
    client: C,
    store: S,
    profile: LedgerProfile,
    config: PipelineConfig,
}

impl<C: ChainSource, S: RecordStore> Pipeline<C, S> {
    /// Create a new pipeline instance
    pub fn new(client: C, store: S, profile: LedgerProfile, config: PipelineConfig) -> Self {
        Self { client, store, profile, config }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_retries: self.config.max_retries, retry_delay: self.config.retry_delay }
    }

    /// Run the pipeline from the checkpoint (or explicit start) up to the target snapshot
    pub async fn run(&self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let mut stats = PipelineStats::new();
        let ledger = self.profile.ledger;

        let checkpoint_before = self.store.get_checkpoint(ledger).await.context("Failed to read checkpoint")?;
        let start_block = self.config.start_block.unwrap_or(checkpoint_before);

        // The target is fixed for the whole run
        let height = self.client.height().await.context("Failed to snapshot chain height")?;
        let target_block = match self.config.end_block {
            Some(end) if end > height => {
                tracing::warn!("End block {} is beyond chain height {}, stopping at the height", end, height);
                height
            }
            Some(end) => end,
            None => height,
        };

        let mut cursor = BlockRangeCursor::new(start_block, target_block, self.config.window_size)?;

        if start_block > checkpoint_before {
            tracing::warn!(
                "Start block {} is past the checkpoint {}; blocks in between stay unprocessed and the checkpoint will not move",
                start_block,
                checkpoint_before
            );
        }

        stats.start_block = start_block;
        stats.target_block = target_block;
        stats.checkpoint_before = checkpoint_before;
        stats.checkpoint_after = checkpoint_before;

        tracing::info!(
            ledger = %ledger,
            start_block,
            target_block,
            checkpoint = checkpoint_before,
            "Starting pipeline"
        );

        println!("\n🚀 Starting {} ingestion...", ledger);
        println!("   📍 Block range: [{}, {})", start_block, target_block);
        println!("   💾 Checkpoint: {}", checkpoint_before);
        println!("   📦 Window size: {}", self.config.window_size);
        println!("   🔄 Max retries: {}", self.config.max_retries);

        while let Some(window) = cursor.next_window() {
            match self.process_window(window, &mut stats).await {
                Ok(next_block) => {
                    cursor.advance(window, next_block)?;

                    let total = target_block.saturating_sub(start_block).max(1);
                    let done = cursor.current().saturating_sub(start_block);
                    let progress = ((done as f64 / total as f64) * 100.0) as usize;
                    println!(
                        "   📊 Progress: block {}/{} ({}%) | 💾 {} inserted | ♻️  {} duplicates",
                        cursor.current(),
                        target_block,
                        progress,
                        stats.records_inserted,
                        stats.duplicates_skipped
                    );
                }
                Err((stage, e)) => {
                    tracing::error!("Window [{}, {}) failed at {}: {:#}", window.from_block, window.to_block, stage, e);
                    stats.error = Some(PipelineError {
                        stage,
                        block: Some(window.from_block),
                        message: format!("{:#}", e),
                    });
                    stats.elapsed_time = start_time.elapsed();

                    println!("\n❌ Pipeline stopped at block {}", window.from_block);
                    self.print_final_stats(&stats);

                    return Err(e.context(format!(
                        "Pipeline stopped; checkpoint is at block {}",
                        stats.checkpoint_after
                    )));
                }
            }
        }

        stats.elapsed_time = start_time.elapsed();

        println!("\n✅ Pipeline complete!");
        self.print_final_stats(&stats);

        Ok(stats)
    }

    /// Process one window. Returns the block the next window starts at.
    async fn process_window(
        &self,
        window: Window,
        stats: &mut PipelineStats,
    ) -> std::result::Result<u64, (PipelineStage, anyhow::Error)> {
        let ledger = self.profile.ledger;

        // Fetch
        let (extracted, extraction) =
            extract_window(&self.client, &self.profile, window, self.retry_policy(), self.config.concurrency)
                .await
                .map_err(|e| (PipelineStage::Fetch, e))?;

        stats.lane_retries += extraction.retries;
        stats.items_past_end += extraction.items_past_end;
        stats.transactions_fetched += extracted.transactions.len();
        stats.logs_fetched += extracted.logs.len();

        // Classify + decode
        let output = transform_window(&self.profile, &extracted);

        stats.failed_status += output.classification.failed_status;
        stats.missing_core_event += output.classification.missing_core_event;
        stats.missing_timestamp += output.classification.missing_timestamp;
        stats.records_decoded += output.records.len();
        stats.decode_anomalies += output.anomalies.len();

        // Commit
        let inserted = self
            .store
            .insert_batch(ledger, &output.records)
            .await
            .map_err(|e| (PipelineStage::Commit, e))?;

        stats.records_inserted += inserted;
        stats.duplicates_skipped += output.records.len() - inserted;
        stats.windows_processed += 1;
        if output.records.is_empty() {
            stats.empty_windows += 1;
        }

        // Checkpoint, only after the commit, never backwards and never across an unprocessed gap
        let next_block = extracted.next_block;
        if window.from_block <= stats.checkpoint_after && next_block > stats.checkpoint_after {
            self.store
                .update_checkpoint(ledger, next_block)
                .await
                .map_err(|e| (PipelineStage::Checkpoint, e))?;
            stats.checkpoint_after = next_block;
        }

        tracing::info!(
            ledger = %ledger,
            from_block = window.from_block,
            to_block = window.to_block,
            next_block,
            transactions = extracted.transactions.len(),
            logs = extracted.logs.len(),
            classified = output.classification.classified,
            decoded = output.records.len(),
            anomalies = output.anomalies.len(),
            inserted,
            duplicates = output.records.len() - inserted,
            "Window processed"
        );

        if next_block < window.to_block {
            tracing::debug!("Window [{}, {}) cut short at {}", window.from_block, window.to_block, next_block);
        }

        Ok(next_block)
    }

    /// Print final statistics
    fn print_final_stats(&self, stats: &PipelineStats) {
        println!("\n📊 Pipeline Statistics ({}):", self.profile.ledger);
        println!("   ⏱️  Total time: {:.2}s", stats.elapsed_time.as_secs_f64());
        println!(
            "   📍 Checkpoint: {} → {} (target {})",
            stats.checkpoint_before, stats.checkpoint_after, stats.target_block
        );
        println!("   📦 Windows: {} processed, {} without records", stats.windows_processed, stats.empty_windows);
        println!(
            "   📥 Fetched: {} transactions, {} logs ({} lane retries)",
            stats.transactions_fetched, stats.logs_fetched, stats.lane_retries
        );
        println!(
            "   🚫 Skipped: {} failed, {} without core event, {} without timestamp",
            stats.failed_status, stats.missing_core_event, stats.missing_timestamp
        );
        println!("   📝 Records decoded: {} ({} anomalies)", stats.records_decoded, stats.decode_anomalies);
        println!("   💾 Records inserted: {} ({} duplicates skipped)", stats.records_inserted, stats.duplicates_skipped);
        println!("   ⚡ Speed: {:.2} blocks/sec", stats.blocks_per_second());
        println!("   ⚡ Throughput: {:.0} records/sec", stats.records_per_second());

        if let Some(error) = &stats.error {
            println!("\n❌ Error: [{}] Block {:?}: {}", error.stage, error.block, error.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractSet;
    use crate::db::Database;
    use crate::models::{BlockHeader, DecodedBetRecord, Ledger, RawLog, RawTransaction};
    use crate::rpc::query::{QueryRequest, QueryResponse};
    use crate::rpc::ChainError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory chain answering every query from fixed data, optionally paging
    struct ScriptedChain {
        height: u64,
        page_limit: Option<u64>,
        blocks: Vec<BlockHeader>,
        transactions: Vec<RawTransaction>,
        logs: Vec<RawLog>,
        requests: Mutex<Vec<(u64, u64)>>,
    }

    impl ScriptedChain {
        fn new(height: u64) -> Self {
            Self {
                height,
                page_limit: None,
                blocks: Vec::new(),
                transactions: Vec::new(),
                logs: Vec::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_page_limit(mut self, limit: u64) -> Self {
            self.page_limit = Some(limit);
            self
        }

        /// Add a successful native bet in `block`
        fn with_bet(mut self, block: u64, bet_id: u64) -> Self {
            let c = ContractSet::default();
            let hash = format!("0x{:064x}", block * 1_000 + bet_id);

            self.blocks.push(BlockHeader { number: block, timestamp: 1_700_000_000 + block as i64 });
            self.transactions.push(RawTransaction {
                hash: hash.clone(),
                from: "0xplayer".to_string(),
                to: Some(c.core_contracts[0].clone()),
                value: "0xde0b6b3a7640000".to_string(),
                input: format!("{}{:064x}{:064x}", c.native_bet_selector, bet_id, 5),
                status: 1,
                block_number: block,
            });
            self.logs.push(RawLog {
                address: c.core_contracts[0].clone(),
                topics: vec![c.bet_event_topic.clone(), format!("0x{:064x}", 1), format!("0x{:064x}", bet_id)],
                data: format!("0x{:0256x}", 5),
                transaction_hash: hash,
                block_number: block,
                log_index: Some(0),
            });
            self
        }

        /// Add a successful claim in `block` paid out by a `token` transfer of `amount` base units
        fn with_token_claim(mut self, block: u64, bet_id: u64, token: &str, amount: u128) -> Self {
            let c = ContractSet::default();
            let hash = format!("0x{:064x}", block * 1_000 + bet_id);

            self.blocks.push(BlockHeader { number: block, timestamp: 1_700_000_000 + block as i64 });
            self.transactions.push(RawTransaction {
                hash: hash.clone(),
                from: "0xwinner".to_string(),
                to: Some(c.core_contracts[1].clone()),
                value: "0x0".to_string(),
                input: format!("{}{:064x}", c.claim_selector, bet_id),
                status: 1,
                block_number: block,
            });
            self.logs.push(RawLog {
                address: c.core_contracts[1].clone(),
                topics: vec![c.claim_event_topic.clone(), format!("0x{:064x}", 1), format!("0x{:064x}", bet_id)],
                data: format!("0x{:064x}{:064x}{:064x}{:064x}", 9, 0, 0, 77),
                transaction_hash: hash.clone(),
                block_number: block,
                log_index: Some(0),
            });
            self.logs.push(RawLog {
                address: token.to_string(),
                topics: vec![c.transfer_topic.clone()],
                data: format!("0x{:064x}", amount),
                transaction_hash: hash,
                block_number: block,
                log_index: Some(1),
            });
            self
        }

        fn requested_windows(&self) -> Vec<(u64, u64)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainSource for ScriptedChain {
        async fn height(&self) -> Result<u64, ChainError> {
            Ok(self.height)
        }

        async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ChainError> {
            self.requests.lock().unwrap().push((request.from_block, request.to_block));

            let end = match self.page_limit {
                Some(limit) => request.to_block.min(request.from_block + limit),
                None => request.to_block,
            };
            let in_range = |block: u64| block >= request.from_block && block < end;

            Ok(QueryResponse {
                blocks: self.blocks.iter().filter(|b| in_range(b.number)).cloned().collect(),
                transactions: self.transactions.iter().filter(|t| in_range(t.block_number)).cloned().collect(),
                logs: self.logs.iter().filter(|l| in_range(l.block_number)).cloned().collect(),
                next_block: end,
                ..Default::default()
            })
        }
    }

    /// Store whose checkpoint write always fails, simulating a crash between commit and checkpoint
    struct CrashBeforeCheckpoint {
        inner: Database,
    }

    #[async_trait]
    impl RecordStore for CrashBeforeCheckpoint {
        async fn get_checkpoint(&self, ledger: Ledger) -> Result<u64> {
            self.inner.get_checkpoint(ledger).await
        }

        async fn update_checkpoint(&self, _ledger: Ledger, _block_number: u64) -> Result<()> {
            anyhow::bail!("process killed")
        }

        async fn insert_batch(&self, ledger: Ledger, records: &[DecodedBetRecord]) -> Result<usize> {
            self.inner.insert_batch(ledger, records).await
        }
    }

    async fn memory_db() -> Database {
        Database::init("sqlite::memory:").await.unwrap()
    }

    fn config(window_size: u64) -> PipelineConfig {
        PipelineConfig { window_size, retry_delay: Duration::from_millis(1), ..Default::default() }
    }

    fn bets_pipeline<C: ChainSource, S: RecordStore>(chain: C, store: S, config: PipelineConfig) -> Pipeline<C, S> {
        Pipeline::new(chain, store, LedgerProfile::new(Ledger::Bets, &ContractSet::default()), config)
    }

    fn sample_chain() -> ScriptedChain {
        ScriptedChain::new(300).with_bet(105, 1).with_bet(150, 2).with_bet(199, 3).with_bet(250, 4)
    }

    async fn fingerprint(db: &Database) -> (i64, String) {
        let digest: Option<String> = sqlx::query_scalar(
            r#"
            SELECT group_concat(row, '|') FROM (
                SELECT tx_hash || ':' || token || ':' || amount_raw || ':' || n_cards || ':' || bet_id AS row
                FROM betting_transactions
                ORDER BY tx_hash
            )
            "#,
        )
        .fetch_one(db.pool())
        .await
        .unwrap();

        (db.count_records(Ledger::Bets).await.unwrap(), digest.unwrap_or_default())
    }

    #[tokio::test]
    async fn test_run_ingests_and_checkpoints() {
        let db = memory_db().await;
        let pipeline = bets_pipeline(sample_chain(), db.clone(), config(100));

        let stats = pipeline.run().await.unwrap();
        assert_eq!(stats.records_inserted, 4);
        assert_eq!(stats.windows_processed, 3);
        assert_eq!(stats.checkpoint_after, 300);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 300);

        let (n_cards, bet_id, amount_raw): (i64, i64, String) =
            sqlx::query_as("SELECT n_cards, bet_id, amount_raw FROM betting_transactions WHERE block_number = 150")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!((n_cards, bet_id), (5, 2));
        assert_eq!(amount_raw, "1000000000000000000");
    }

    #[tokio::test]
    async fn test_rerun_over_same_range_is_idempotent() {
        let db = memory_db().await;
        let full = PipelineConfig { start_block: Some(0), ..config(100) };

        bets_pipeline(sample_chain(), db.clone(), full.clone()).run().await.unwrap();
        let first = fingerprint(&db).await;

        let stats = bets_pipeline(sample_chain(), db.clone(), full).run().await.unwrap();
        assert_eq!(stats.records_inserted, 0);
        assert_eq!(stats.duplicates_skipped, 4);
        assert_eq!(fingerprint(&db).await, first);
        assert_eq!(first.0, 4);
    }

    #[tokio::test]
    async fn test_resume_after_crash_before_checkpoint() {
        let db = memory_db().await;
        db.update_checkpoint(Ledger::Bets, 100).await.unwrap();
        let chain = || ScriptedChain::new(200).with_bet(105, 1).with_bet(150, 2);

        let crashed = bets_pipeline(chain(), CrashBeforeCheckpoint { inner: db.clone() }, config(100));
        assert!(crashed.run().await.is_err());
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 100);
        assert_eq!(db.count_records(Ledger::Bets).await.unwrap(), 2);

        let resumed = bets_pipeline(chain(), db.clone(), config(100));
        let stats = resumed.run().await.unwrap();
        assert_eq!(stats.start_block, 100);
        assert_eq!(stats.records_inserted, 0);
        assert_eq!(db.count_records(Ledger::Bets).await.unwrap(), 2);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_window_underflow_resumes_at_next_block() {
        let db = memory_db().await;
        db.update_checkpoint(Ledger::Bets, 100).await.unwrap();
        let chain = ScriptedChain::new(200).with_bet(120, 1).with_bet(150, 2).with_bet(199, 3).with_page_limit(40);

        let pipeline = bets_pipeline(chain, db.clone(), config(100));
        let stats = pipeline.run().await.unwrap();

        let starts: Vec<u64> = pipeline_requests(&pipeline).iter().map(|(from, _)| *from).collect();
        assert_eq!(starts, vec![100, 100, 140, 140, 180, 180]);
        assert_eq!(stats.records_inserted, 3);
        assert_eq!(stats.checkpoint_after, 200);
    }

    fn pipeline_requests<S>(pipeline: &Pipeline<ScriptedChain, S>) -> Vec<(u64, u64)> {
        pipeline.client.requested_windows()
    }

    #[tokio::test]
    async fn test_empty_windows_advance_checkpoint() {
        let db = memory_db().await;
        let pipeline = bets_pipeline(ScriptedChain::new(50_000), db.clone(), config(10_000));

        let stats = pipeline.run().await.unwrap();
        assert_eq!(stats.windows_processed, 5);
        assert_eq!(stats.empty_windows, 5);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 50_000);
    }

    #[tokio::test]
    async fn test_checkpoint_never_moves_backwards() {
        let db = memory_db().await;
        db.update_checkpoint(Ledger::Bets, 500).await.unwrap();

        let reprocess = PipelineConfig { start_block: Some(0), end_block: Some(300), ..config(100) };
        let stats = bets_pipeline(sample_chain(), db.clone(), reprocess).run().await.unwrap();

        assert_eq!(stats.records_inserted, 4);
        assert_eq!(stats.checkpoint_after, 500);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_end_block_is_capped_by_height() {
        let db = memory_db().await;
        let cfg = PipelineConfig { end_block: Some(1_000), ..config(100) };
        let stats = bets_pipeline(sample_chain(), db.clone(), cfg).run().await.unwrap();

        assert_eq!(stats.target_block, 300);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_checkpoint() {
        use crate::rpc::MockChainSource;

        let db = memory_db().await;
        db.update_checkpoint(Ledger::Bets, 10).await.unwrap();

        let mut mock = MockChainSource::new();
        mock.expect_height().returning(|| Ok(1_000));
        mock.expect_query().returning(|_| Err(ChainError::Transport("connection refused".to_string())));

        let pipeline = bets_pipeline(mock, db.clone(), config(100));
        assert!(pipeline.run().await.is_err());
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_claims_ledger_end_to_end() {
        let db = memory_db().await;
        let c = ContractSet::default();
        let chain = ScriptedChain::new(1_000)
            .with_token_claim(120, 7, &c.rbsd_token, 4_000_000_000_000_000_000)
            .with_token_claim(640, 8, &c.jerry_token, 500_000_000_000_000_000);

        let pipeline = Pipeline::new(chain, db.clone(), LedgerProfile::new(Ledger::Claims, &c), config(500));
        let stats = pipeline.run().await.unwrap();
        assert_eq!(stats.records_inserted, 2);
        assert_eq!(pipeline_requests(&pipeline).len(), 2);

        let rows: Vec<(String, String, i64, i64)> =
            sqlx::query_as("SELECT token, amount_raw, n_cards, bet_id FROM claiming_transactions ORDER BY block_number")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![
                ("RBSD".to_string(), "4000000000000000000".to_string(), 0, 7),
                ("JERRY".to_string(), "500000000000000000".to_string(), 0, 8),
            ]
        );

        assert_eq!(db.get_checkpoint(Ledger::Claims).await.unwrap(), 1_000);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 0);
        assert_eq!(db.count_records(Ledger::Bets).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_past_checkpoint_does_not_skip_gap() {
        let db = memory_db().await;
        db.update_checkpoint(Ledger::Bets, 100).await.unwrap();

        let cfg = PipelineConfig { start_block: Some(200), ..config(100) };
        let stats = bets_pipeline(sample_chain(), db.clone(), cfg).run().await.unwrap();

        assert_eq!(stats.records_inserted, 1);
        assert_eq!(stats.checkpoint_after, 100);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 100);

        // the next incremental run still covers [100, 200)
        let stats = bets_pipeline(sample_chain(), db.clone(), config(100)).run().await.unwrap();
        assert_eq!(stats.start_block, 100);
        assert_eq!(stats.records_inserted, 3);
        assert_eq!(db.get_checkpoint(Ledger::Bets).await.unwrap(), 300);
    }
}
