/// ETL Module
///
/// The per-window stages of the ingestion pipeline:
/// - Extract: Fetch transactions, logs and block timestamps from HyperSync
/// - Transform: Classify transactions by settlement token and decode their payloads
/// - Load: Store decoded records in SQLite
pub mod extract;
pub mod load;
pub mod parsers;
pub mod transform;
