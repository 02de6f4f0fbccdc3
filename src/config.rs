/// Configuration Module
///
/// Contract addresses, selectors and event signatures are an immutable value
/// (`ContractSet`) passed into the pipeline. A `LedgerProfile` turns that value
/// into the rule table for one ledger: which logs mark a transaction as relevant,
/// which token categories exist in which priority, where each field is decoded
/// from, and which queries fetch a window.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::{Ledger, TokenCategory};
use crate::rpc::query::{LogSelection, TransactionSelection};

/// ERC-20 `Transfer(address,address,uint256)`
pub const TRANSFER_EVENT_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub const DEFAULT_HYPERSYNC_URL: &str = "https://monad-testnet.hypersync.xyz";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://rbs_ledger.db";

/// Deployed contracts and signatures of the game. Defaults are the Monad testnet deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContractSet {
    pub core_contracts: Vec<String>,
    pub jerry_token: String,
    pub rbsd_token: String,
    pub transfer_topic: String,
    pub native_bet_selector: String,
    pub token_bet_selector: String,
    pub bet_event_topic: String,
    pub claim_selector: String,
    pub claim_event_topic: String,
}

impl Default for ContractSet {
    fn default() -> Self {
        Self {
            core_contracts: vec![
                "0x3ad50059d6008b711209a509fe58e68f0b672a42".to_string(),
                "0x740990cb01e893a371a050736c62ae0b779109e7".to_string(),
            ],
            jerry_token: "0xda054a96254776346386060c480b42a10c870cd2".to_string(),
            rbsd_token: "0x8a86d48c867b76ff74a36d3af4d2f1e707b143ed".to_string(),
            transfer_topic: TRANSFER_EVENT_TOPIC.to_string(),
            native_bet_selector: "0x5029defb".to_string(),
            token_bet_selector: "0xb65c106f".to_string(),
            bet_event_topic: "0xefc52bf7792453af1461fa9a7097486359b41a048898b6d542c0f03389487187".to_string(),
            claim_selector: "0xa11fd1e3".to_string(),
            claim_event_topic: "0x9f930e45e5f186baa9054d3efb58f5f12c8894372119fb461d8abd2b9418cf2d".to_string(),
        }
    }
}

impl ContractSet {
    /// Load overrides from a JSON file; fields not present keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read contract set from {}", path.display()))?;
        let set: ContractSet = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse contract set in {}", path.display()))?;

        Ok(set.normalized())
    }

    /// Lowercase every hex identifier so matching never depends on checksum casing
    pub fn normalized(mut self) -> Self {
        let lower = |s: &mut String| *s = s.to_ascii_lowercase();
        self.core_contracts.iter_mut().for_each(lower);
        for field in [
            &mut self.jerry_token,
            &mut self.rbsd_token,
            &mut self.transfer_topic,
            &mut self.native_bet_selector,
            &mut self.token_bet_selector,
            &mut self.bet_event_topic,
            &mut self.claim_selector,
            &mut self.claim_event_topic,
        ] {
            lower(field);
        }
        self
    }
}

/// Where a record's amount comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSource {
    /// Native `value` of the transaction
    NativeValue,
    /// First data word of the category's transfer log
    TransferLog,
    /// First data word of the core event log
    CoreEventData,
}

/// Where a record's card count comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardCountSource {
    /// Second argument word of the call-data
    CallData,
    /// Fourth data word of the core event log
    CoreEventData,
    /// Ledger carries no card count
    Absent,
}

/// A token category recognised by a co-occurring transfer log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRule {
    pub category: TokenCategory,
    pub token_address: String,
    pub transfer_topic: String,
    pub amount: AmountSource,
    pub card_count: CardCountSource,
}

/// Category assigned when no token rule matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRule {
    pub category: TokenCategory,
    pub amount: AmountSource,
    pub card_count: CardCountSource,
}

/// One query issued per window; lanes of a window run concurrently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLane {
    pub name: &'static str,
    pub transactions: Vec<TransactionSelection>,
    pub logs: Vec<LogSelection>,
}

/// Rule table for one ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerProfile {
    pub ledger: Ledger,
    pub core_contracts: Vec<String>,
    pub core_event_topic: String,
    /// Evaluated in order; the first rule whose transfer log is present wins
    pub token_rules: Vec<TokenRule>,
    pub native: NativeRule,
    pub lanes: Vec<FetchLane>,
}

impl LedgerProfile {
    pub fn new(ledger: Ledger, contracts: &ContractSet) -> Self {
        match ledger {
            Ledger::Bets => Self::bets(contracts),
            Ledger::Claims => Self::claims(contracts),
        }
    }

    fn token_rules(contracts: &ContractSet, card_count: CardCountSource) -> Vec<TokenRule> {
        [(TokenCategory::Jerry, &contracts.jerry_token), (TokenCategory::Rbsd, &contracts.rbsd_token)]
            .into_iter()
            .map(|(category, address)| TokenRule {
                category,
                token_address: address.clone(),
                transfer_topic: contracts.transfer_topic.clone(),
                amount: AmountSource::TransferLog,
                card_count,
            })
            .collect()
    }

    fn token_transfer_logs(contracts: &ContractSet) -> LogSelection {
        LogSelection {
            address: vec![contracts.jerry_token.clone(), contracts.rbsd_token.clone()],
            topics: vec![vec![contracts.transfer_topic.clone()]],
        }
    }

    fn core_event_logs(contracts: &ContractSet, topic: &str) -> LogSelection {
        LogSelection { address: contracts.core_contracts.clone(), topics: vec![vec![topic.to_string()]] }
    }

    fn bets(contracts: &ContractSet) -> Self {
        let core_logs = Self::core_event_logs(contracts, &contracts.bet_event_topic);

        Self {
            ledger: Ledger::Bets,
            core_contracts: contracts.core_contracts.clone(),
            core_event_topic: contracts.bet_event_topic.clone(),
            token_rules: Self::token_rules(contracts, CardCountSource::CoreEventData),
            native: NativeRule {
                category: TokenCategory::Mon,
                amount: AmountSource::NativeValue,
                card_count: CardCountSource::CallData,
            },
            lanes: vec![
                FetchLane {
                    name: "native",
                    transactions: vec![TransactionSelection {
                        to: contracts.core_contracts.clone(),
                        sighash: vec![contracts.native_bet_selector.clone()],
                    }],
                    logs: vec![core_logs.clone()],
                },
                FetchLane {
                    name: "token",
                    transactions: vec![TransactionSelection {
                        to: contracts.core_contracts.clone(),
                        sighash: vec![contracts.token_bet_selector.clone()],
                    }],
                    logs: vec![core_logs, Self::token_transfer_logs(contracts)],
                },
            ],
        }
    }

    fn claims(contracts: &ContractSet) -> Self {
        Self {
            ledger: Ledger::Claims,
            core_contracts: contracts.core_contracts.clone(),
            core_event_topic: contracts.claim_event_topic.clone(),
            token_rules: Self::token_rules(contracts, CardCountSource::Absent),
            native: NativeRule {
                category: TokenCategory::Mon,
                amount: AmountSource::CoreEventData,
                card_count: CardCountSource::Absent,
            },
            lanes: vec![FetchLane {
                name: "claims",
                transactions: vec![TransactionSelection {
                    to: contracts.core_contracts.clone(),
                    sighash: vec![contracts.claim_selector.clone()],
                }],
                logs: vec![
                    Self::core_event_logs(contracts, &contracts.claim_event_topic),
                    Self::token_transfer_logs(contracts),
                ],
            }],
        }
    }
}

/// Runtime settings of one ingestion run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub hypersync_url: String,
    pub bearer_token: String,
    pub database_url: String,
    pub window_size: u64,
    pub concurrency: usize,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}
