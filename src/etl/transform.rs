/// Transform Module
///
/// Correlates transactions with their logs, assigns a settlement-token
/// category from the ledger's rule table, and decodes the fields of each
/// qualifying transaction into a `DecodedBetRecord`.
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::Zero;
use std::collections::HashMap;

use crate::config::{AmountSource, CardCountSource, LedgerProfile};
use crate::etl::extract::ExtractedWindow;
use crate::etl::parsers::{
    try_amount_from_log_data, try_bet_id, try_card_count_from_input, try_card_count_from_log, try_decode_amount,
    DecodeError,
};
use crate::models::{DecodedBetRecord, RawLog, RawTransaction, TokenCategory};

/// Logs of one window keyed by transaction hash, in log order. Built once, read-only afterwards.
#[derive(Debug, Default)]
pub struct LogsByTransaction<'a> {
    by_hash: HashMap<&'a str, Vec<&'a RawLog>>,
}

impl<'a> LogsByTransaction<'a> {
    pub fn build(logs: &'a [RawLog]) -> Self {
        let mut by_hash: HashMap<&'a str, Vec<&'a RawLog>> = HashMap::new();
        for log in logs {
            by_hash.entry(log.transaction_hash.as_str()).or_default().push(log);
        }

        Self { by_hash }
    }

    pub fn get(&self, tx_hash: &str) -> &[&'a RawLog] {
        self.by_hash.get(tx_hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

/// A transaction that qualified for the ledger, with the logs its fields are decoded from
#[derive(Debug, Clone)]
pub struct ClassifiedTransaction<'a> {
    pub transaction: &'a RawTransaction,
    pub category: TokenCategory,
    pub timestamp: i64,
    pub core_event: &'a RawLog,
    pub transfer: Option<&'a RawLog>,
    pub amount_source: AmountSource,
    pub card_count_source: CardCountSource,
}

/// Classification counts for one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    pub transactions_seen: usize,
    pub failed_status: usize,
    pub duplicate_hashes: usize,
    pub missing_core_event: usize,
    pub missing_timestamp: usize,
    pub classified: usize,
}

/// Assigns token categories using a ledger profile
pub struct TransactionClassifier<'p> {
    profile: &'p LedgerProfile,
}

impl<'p> TransactionClassifier<'p> {
    pub fn new(profile: &'p LedgerProfile) -> Self {
        Self { profile }
    }

    fn core_event<'a>(&self, logs: &[&'a RawLog]) -> Option<&'a RawLog> {
        logs.iter().copied().find(|log| log.is_event(&self.profile.core_contracts, &self.profile.core_event_topic))
    }

    /// Category of a transaction that carries a core event. Token rules are tried in priority order.
    pub fn categorize<'a>(
        &self,
        logs: &[&'a RawLog],
    ) -> (TokenCategory, Option<&'a RawLog>, AmountSource, CardCountSource) {
        for rule in &self.profile.token_rules {
            let transfer = logs
                .iter()
                .copied()
                .find(|log| log.is_event(std::slice::from_ref(&rule.token_address), &rule.transfer_topic));
            if let Some(transfer) = transfer {
                return (rule.category, Some(transfer), rule.amount, rule.card_count);
            }
        }

        let native = &self.profile.native;
        (native.category, None, native.amount, native.card_count)
    }

    /// Classify every successful transaction of the window; each hash is emitted at most once
    pub fn classify<'a>(
        &self,
        window: &'a ExtractedWindow,
        logs: &LogsByTransaction<'a>,
    ) -> (Vec<ClassifiedTransaction<'a>>, ClassificationStats) {
        let mut stats = ClassificationStats::default();
        let mut seen = std::collections::HashSet::new();
        let mut classified = Vec::new();

        for tx in &window.transactions {
            stats.transactions_seen += 1;

            if !tx.succeeded() {
                stats.failed_status += 1;
                continue;
            }
            if !seen.insert(tx.hash.as_str()) {
                stats.duplicate_hashes += 1;
                continue;
            }

            let tx_logs = logs.get(&tx.hash);
            let Some(core_event) = self.core_event(tx_logs) else {
                stats.missing_core_event += 1;
                continue;
            };
            let Some(timestamp) = window.timestamps.get(&tx.block_number).copied() else {
                stats.missing_timestamp += 1;
                continue;
            };

            let (category, transfer, amount_source, card_count_source) = self.categorize(tx_logs);
            classified.push(ClassifiedTransaction {
                transaction: tx,
                category,
                timestamp,
                core_event,
                transfer,
                amount_source,
                card_count_source,
            });
        }

        stats.classified = classified.len();
        (classified, stats)
    }
}

/// A field that fell back to its default while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAnomaly {
    pub tx_hash: String,
    pub field: &'static str,
    pub error: DecodeError,
}

fn decode_amount(classified: &ClassifiedTransaction<'_>) -> Result<BigDecimal, DecodeError> {
    match classified.amount_source {
        AmountSource::NativeValue => try_decode_amount(&classified.transaction.value),
        AmountSource::CoreEventData => try_amount_from_log_data(&classified.core_event.data),
        AmountSource::TransferLog => match classified.transfer {
            Some(transfer) => try_amount_from_log_data(&transfer.data),
            None => Ok(BigDecimal::zero()),
        },
    }
}

fn decode_card_count(classified: &ClassifiedTransaction<'_>) -> Result<u64, DecodeError> {
    match classified.card_count_source {
        CardCountSource::CallData => try_card_count_from_input(&classified.transaction.input),
        CardCountSource::CoreEventData => try_card_count_from_log(&classified.core_event.data),
        CardCountSource::Absent => Ok(0),
    }
}

/// Decode one classified transaction. Malformed fields degrade to their defaults and are reported.
pub fn decode_record(classified: &ClassifiedTransaction<'_>) -> (DecodedBetRecord, Vec<DecodeAnomaly>) {
    let tx = classified.transaction;
    let mut anomalies = Vec::new();
    let mut note = |field: &'static str, error: DecodeError| {
        anomalies.push(DecodeAnomaly { tx_hash: tx.hash.clone(), field, error });
    };

    let amount = decode_amount(classified).unwrap_or_else(|e| {
        note("amount", e);
        BigDecimal::zero()
    });
    let card_count = decode_card_count(classified).unwrap_or_else(|e| {
        note("card_count", e);
        0
    });
    let bet_id = try_bet_id(&classified.core_event.topics).unwrap_or_else(|e| {
        note("bet_id", e);
        0
    });

    let timestamp = DateTime::<Utc>::from_timestamp(classified.timestamp, 0).unwrap_or_else(|| {
        note("timestamp", DecodeError::Overflow(classified.timestamp.to_string()));
        DateTime::<Utc>::UNIX_EPOCH
    });

    let record = DecodedBetRecord {
        timestamp,
        tx_hash: tx.hash.clone(),
        from_address: tx.from.clone(),
        to_address: tx.to.clone().unwrap_or_else(|| classified.core_event.address.clone()),
        token: classified.category,
        amount,
        card_count,
        bet_id,
        block_number: tx.block_number,
    };

    (record, anomalies)
}

/// Result of transforming a window
#[derive(Debug, Default)]
pub struct TransformOutput {
    pub records: Vec<DecodedBetRecord>,
    pub classification: ClassificationStats,
    pub anomalies: Vec<DecodeAnomaly>,
}

/// Classify and decode a whole window
pub fn transform_window(profile: &LedgerProfile, window: &ExtractedWindow) -> TransformOutput {
    let logs = LogsByTransaction::build(&window.logs);
    let classifier = TransactionClassifier::new(profile);
    let (classified, classification) = classifier.classify(window, &logs);

    let mut output = TransformOutput { classification, ..Default::default() };
    for item in &classified {
        let (record, anomalies) = decode_record(item);
        for anomaly in &anomalies {
            tracing::debug!(
                tx_hash = %anomaly.tx_hash,
                field = anomaly.field,
                error = %anomaly.error,
                "Decode anomaly, storing default"
            );
        }
        output.anomalies.extend(anomalies);
        output.records.push(record);
    }

    output
}
