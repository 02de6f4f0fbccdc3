/// RBS Ledger Ingest
///
/// A checkpointed ETL pipeline that pulls bet and claim transactions of the
/// on-chain card game from HyperSync and stores them in SQLite.
pub mod cli;
pub mod config;
pub mod cursor;
pub mod db;
pub mod etl;
pub mod models;
pub mod pipeline;
pub mod rpc;
