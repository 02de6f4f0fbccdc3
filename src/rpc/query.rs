/// HyperSync Query Types
///
/// Request and response shapes of the remote chain-indexing service. Wire
/// structs are lenient: numeric fields may arrive as JSON numbers,
/// decimal strings or `0x` hex quantities, and items missing required fields are
/// dropped instead of failing the whole response.
use crate::models::{BlockHeader, RawLog, RawTransaction};
use serde::{Deserialize, Serialize};

/// Transaction filter: calls to any of `to` whose input starts with one of `sighash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSelection {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sighash: Vec<String>,
}

/// Log filter: logs emitted by any of `address`, optionally narrowed by topic sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSelection {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Vec<String>>,
}

/// Columns requested for each returned entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSelection {
    pub block: Vec<String>,
    pub transaction: Vec<String>,
    pub log: Vec<String>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        let owned = |fields: &[&str]| fields.iter().map(|f| f.to_string()).collect();
        Self {
            block: owned(&["number", "timestamp"]),
            transaction: owned(&["hash", "from", "to", "value", "input", "status", "block_number"]),
            log: owned(&[
                "address",
                "topic0",
                "topic1",
                "topic2",
                "topic3",
                "data",
                "transaction_hash",
                "block_number",
                "log_index",
            ]),
        }
    }
}

/// One query over the half-open block range `[from_block, to_block)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub from_block: u64,
    pub to_block: u64,
    pub transactions: Vec<TransactionSelection>,
    pub logs: Vec<LogSelection>,
    pub field_selection: FieldSelection,
}

/// Decoded response. `next_block` is where the service stopped, which may be short of `to_block`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub blocks: Vec<BlockHeader>,
    pub transactions: Vec<RawTransaction>,
    pub logs: Vec<RawLog>,
    pub next_block: u64,
    pub archive_height: Option<u64>,
    pub dropped_items: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeightResponse {
    pub height: Quantity,
}

/// A number that may be encoded as a JSON integer, a decimal string or a hex string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Quantity {
    Num(u64),
    Str(String),
}

impl Quantity {
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Str(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some("") => Some(0),
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponseWire {
    #[serde(default)]
    data: Option<ResponseData>,
    next_block: Quantity,
    #[serde(default)]
    archive_height: Option<Quantity>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseData {
    Batches(Vec<ResponseBatch>),
    Single(ResponseBatch),
}

#[derive(Debug, Default, Deserialize)]
struct ResponseBatch {
    #[serde(default)]
    blocks: Vec<BlockWire>,
    #[serde(default)]
    transactions: Vec<TransactionWire>,
    #[serde(default)]
    logs: Vec<LogWire>,
}

#[derive(Debug, Deserialize)]
struct BlockWire {
    number: Option<Quantity>,
    timestamp: Option<Quantity>,
}

#[derive(Debug, Deserialize)]
struct TransactionWire {
    hash: Option<String>,
    from: Option<String>,
    to: Option<String>,
    value: Option<String>,
    input: Option<String>,
    status: Option<Quantity>,
    block_number: Option<Quantity>,
}

#[derive(Debug, Deserialize)]
struct LogWire {
    address: Option<String>,
    #[serde(default)]
    topics: Option<Vec<Option<String>>>,
    topic0: Option<String>,
    topic1: Option<String>,
    topic2: Option<String>,
    topic3: Option<String>,
    data: Option<String>,
    transaction_hash: Option<String>,
    block_number: Option<Quantity>,
    log_index: Option<Quantity>,
}

impl BlockWire {
    /// Blocks without a number or with a zero/missing timestamp cannot stamp records
    fn into_header(self) -> Option<BlockHeader> {
        let number = self.number?.to_u64()?;
        let timestamp = self.timestamp?.to_u64().filter(|ts| *ts > 0)?;
        Some(BlockHeader { number, timestamp: i64::try_from(timestamp).ok()? })
    }
}

impl TransactionWire {
    fn into_raw(self) -> Option<RawTransaction> {
        Some(RawTransaction {
            hash: self.hash?,
            from: self.from.unwrap_or_default(),
            to: self.to,
            value: self.value.unwrap_or_default(),
            input: self.input.unwrap_or_default(),
            status: self.status.and_then(|s| s.to_u64()).unwrap_or(0),
            block_number: self.block_number?.to_u64()?,
        })
    }
}

impl LogWire {
    fn into_raw(self) -> Option<RawLog> {
        // Either a `topics` array or individual topicN columns; trailing empties are not topics
        let mut topics: Vec<String> = match self.topics {
            Some(list) => list.into_iter().map(Option::unwrap_or_default).collect(),
            None => [self.topic0, self.topic1, self.topic2, self.topic3]
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
        };
        while topics.last().is_some_and(|t| t.is_empty()) {
            topics.pop();
        }

        Some(RawLog {
            address: self.address?,
            topics,
            data: self.data.unwrap_or_default(),
            transaction_hash: self.transaction_hash?,
            block_number: self.block_number.and_then(|b| b.to_u64()).unwrap_or(0),
            log_index: self.log_index.and_then(|i| i.to_u64()),
        })
    }
}

impl QueryResponseWire {
    pub fn into_response(self) -> Option<QueryResponse> {
        let batches = match self.data {
            Some(ResponseData::Batches(batches)) => batches,
            Some(ResponseData::Single(batch)) => vec![batch],
            None => Vec::new(),
        };

        let mut response = QueryResponse {
            next_block: self.next_block.to_u64()?,
            archive_height: self.archive_height.and_then(|h| h.to_u64()),
            ..Default::default()
        };

        let mut received = 0;
        for batch in batches {
            received += batch.blocks.len() + batch.transactions.len() + batch.logs.len();
            response.blocks.extend(batch.blocks.into_iter().filter_map(BlockWire::into_header));
            response.transactions.extend(batch.transactions.into_iter().filter_map(TransactionWire::into_raw));
            response.logs.extend(batch.logs.into_iter().filter_map(LogWire::into_raw));
        }
        let kept = response.blocks.len() + response.transactions.len() + response.logs.len();
        response.dropped_items = received - kept;

        Some(response)
    }
}
