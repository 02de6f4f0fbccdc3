/// Data Models Module
///
/// This module defines the core data structures used throughout the application.
/// Raw chain data (blocks, transactions, logs) lives only for one fetch window;
/// decoded records are what gets persisted.
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Block header as returned by the chain service, used only to stamp records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub timestamp: i64,
}

/// A transaction as returned by the chain service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub input: String,
    pub status: u64,
    pub block_number: u64,
}

impl RawTransaction {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// An event log as returned by the chain service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub log_index: Option<u64>,
}

impl RawLog {
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }

    /// Case-insensitive match on emitting contract and event signature
    pub fn is_event(&self, addresses: &[String], topic0: &str) -> bool {
        addresses.iter().any(|a| a.eq_ignore_ascii_case(&self.address))
            && self.topic0().is_some_and(|t| t.eq_ignore_ascii_case(topic0))
    }
}

/// Block number -> Unix timestamp for one fetch window
pub type BlockTimestamps = HashMap<u64, i64>;

/// Which ledger a pipeline run ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    Bets,
    Claims,
}

impl Ledger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bets => "bets",
            Self::Claims => "claims",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Bets => "betting_transactions",
            Self::Claims => "claiming_transactions",
        }
    }

    /// Fetch window used when none is configured
    pub fn default_window_size(&self) -> u64 {
        match self {
            Self::Bets => 10_000,
            Self::Claims => 500_000,
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement token a bet or claim was denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    Mon,
    Jerry,
    Rbsd,
}

impl TokenCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mon => "MON",
            Self::Jerry => "JERRY",
            Self::Rbsd => "RBSD",
        }
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded bet or claim, one per transaction hash. Never mutated once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBetRecord {
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub token: TokenCategory,
    pub amount: BigDecimal,
    pub card_count: u64,
    pub bet_id: u64,
    pub block_number: u64,
}

/// Per-token aggregate shown by the stats report
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenStats {
    pub token: String,
    pub count: i64,
    pub volume: f64,
    pub average: f64,
}

/// Store-level summary of one ledger
#[derive(Debug, Clone)]
pub struct LedgerStats {
    pub ledger: Ledger,
    pub total_records: i64,
    pub unique_senders: i64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub min_block: Option<i64>,
    pub max_block: Option<i64>,
    pub checkpoint: u64,
    pub tokens: Vec<TokenStats>,
}

/// Connection status information displayed at startup
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub endpoint: String,
    pub height: u64,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(address: &str, topic0: &str) -> RawLog {
        RawLog {
            address: address.to_string(),
            topics: vec![topic0.to_string()],
            data: "0x".to_string(),
            transaction_hash: "0x01".to_string(),
            block_number: 1,
            log_index: Some(0),
        }
    }

    #[test]
    fn test_is_event_ignores_case() {
        let l = log("0x8A86D48C867B76FF74A36D3AF4D2F1E707B143ED", "0xDDF2");
        assert!(l.is_event(&["0x8a86d48c867b76ff74a36d3af4d2f1e707b143ed".to_string()], "0xddf2"));
        assert!(!l.is_event(&["0x00".to_string()], "0xddf2"));
        assert!(!l.is_event(&["0x8a86d48c867b76ff74a36d3af4d2f1e707b143ed".to_string()], "0xffff"));
    }

    #[test]
    fn test_token_category_names() {
        assert_eq!(TokenCategory::Jerry.as_str(), "JERRY");
        assert_eq!(TokenCategory::Rbsd.to_string(), "RBSD");
        assert_eq!(TokenCategory::Mon.as_str(), "MON");
    }

    #[test]
    fn test_ledger_tables() {
        assert_eq!(Ledger::Bets.table(), "betting_transactions");
        assert_eq!(Ledger::Claims.table(), "claiming_transactions");
        assert!(Ledger::Claims.default_window_size() > Ledger::Bets.default_window_size());
    }
}
