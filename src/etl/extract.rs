/// Extract Module
///
/// Fetches one block window from the chain service. Every lane of the ledger
/// profile is queried concurrently (bounded), each with its own retries, and
/// the results are merged into a single window view.
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{FetchLane, LedgerProfile};
use crate::cursor::Window;
use crate::models::{BlockTimestamps, RawLog, RawTransaction};
use crate::rpc::query::{FieldSelection, QueryRequest, QueryResponse};
use crate::rpc::{ChainError, ChainSource};

/// Retry policy for a single lane fetch
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub retry_delay: Duration,
}

/// Everything fetched for one window, cut at the window's effective end
#[derive(Debug, Clone, Default)]
pub struct ExtractedWindow {
    /// Exclusive; the smallest `next_block` reported across lanes
    pub next_block: u64,
    pub timestamps: BlockTimestamps,
    pub transactions: Vec<RawTransaction>,
    pub logs: Vec<RawLog>,
}

/// Statistics of a window extraction
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionStats {
    pub lanes: usize,
    pub retries: usize,
    pub items_past_end: usize,
}

pub fn build_request(lane: &FetchLane, window: Window) -> QueryRequest {
    QueryRequest {
        from_block: window.from_block,
        to_block: window.to_block,
        transactions: lane.transactions.clone(),
        logs: lane.logs.clone(),
        field_selection: FieldSelection::default(),
    }
}

/// Query one lane, retrying transient failures with linear backoff.
///
/// Returns the response and how many retries it took.
pub async fn fetch_lane<C: ChainSource + ?Sized>(
    client: &C,
    lane: &FetchLane,
    window: Window,
    policy: RetryPolicy,
) -> Result<(QueryResponse, usize)> {
    let request = build_request(lane, window);
    let mut retry_count = 0;

    loop {
        let result = client.query(&request).await.and_then(|response| {
            if response.next_block <= window.from_block {
                Err(ChainError::NoProgress { from_block: window.from_block, next_block: response.next_block })
            } else {
                Ok(response)
            }
        });

        match result {
            Ok(response) => return Ok((response, retry_count)),
            Err(e) => {
                retry_count += 1;

                if !e.is_retryable() || retry_count >= policy.max_retries {
                    return Err(anyhow::Error::new(e).context(format!(
                        "Failed to fetch lane '{}' for blocks [{}, {}) after {} attempts",
                        lane.name, window.from_block, window.to_block, retry_count
                    )));
                }

                tracing::warn!(
                    "Fetch failed for lane '{}' blocks [{}, {}), retrying ({}/{}): {}",
                    lane.name,
                    window.from_block,
                    window.to_block,
                    retry_count,
                    policy.max_retries,
                    e
                );

                sleep(policy.retry_delay * retry_count as u32).await;
            }
        }
    }
}

/// Fetch every lane of `profile` for `window` and merge the results
pub async fn extract_window<C: ChainSource + ?Sized>(
    client: &C,
    profile: &LedgerProfile,
    window: Window,
    policy: RetryPolicy,
    concurrency: usize,
) -> Result<(ExtractedWindow, ExtractionStats)> {
    let responses: Vec<(QueryResponse, usize)> = stream::iter(profile.lanes.iter())
        .map(|lane| fetch_lane(client, lane, window, policy))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
        .with_context(|| format!("Failed to extract window [{}, {})", window.from_block, window.to_block))?;

    Ok(merge_responses(window, responses))
}

/// Merge lane responses. Data at or past the smallest `next_block` is discarded so that
/// every kept transaction has the logs of all lanes; it is fetched again by the next window.
pub fn merge_responses(window: Window, responses: Vec<(QueryResponse, usize)>) -> (ExtractedWindow, ExtractionStats) {
    let next_block = responses
        .iter()
        .map(|(r, _)| r.next_block.min(window.to_block))
        .min()
        .unwrap_or(window.to_block);

    let mut stats = ExtractionStats { lanes: responses.len(), ..Default::default() };
    let mut timestamps = HashMap::new();
    let mut transactions: HashMap<String, RawTransaction> = HashMap::new();
    let mut logs: HashSet<RawLog> = HashSet::new();

    let in_range = |block: u64| block >= window.from_block && block < next_block;

    for (response, retries) in responses {
        stats.retries += retries;

        for block in response.blocks {
            if in_range(block.number) {
                timestamps.insert(block.number, block.timestamp);
            } else {
                stats.items_past_end += 1;
            }
        }
        for tx in response.transactions {
            if in_range(tx.block_number) {
                transactions.entry(tx.hash.clone()).or_insert(tx);
            } else {
                stats.items_past_end += 1;
            }
        }
        for log in response.logs {
            // logs without a block number are kept and correlated through their transaction
            if log.block_number == 0 || in_range(log.block_number) {
                logs.insert(log);
            } else {
                stats.items_past_end += 1;
            }
        }
    }

    let mut transactions: Vec<RawTransaction> = transactions.into_values().collect();
    transactions.sort_by(|a, b| (a.block_number, &a.hash).cmp(&(b.block_number, &b.hash)));

    let mut logs: Vec<RawLog> = logs.into_iter().collect();
    logs.sort_by(|a, b| {
        (a.block_number, a.log_index, &a.transaction_hash, &a.address, &a.topics, &a.data).cmp(&(
            b.block_number,
            b.log_index,
            &b.transaction_hash,
            &b.address,
            &b.topics,
            &b.data,
        ))
    });

    let window = ExtractedWindow {
        next_block,
        timestamps,
        transactions,
        logs,
    };

    (window, stats)
}
