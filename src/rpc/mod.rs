/// RPC Client Module
///
/// This module handles all interactions with the remote chain-indexing service
/// (HyperSync). It exposes the `ChainSource` seam the pipeline consumes and a
/// reqwest-backed implementation of it.
pub mod query;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use crate::models::ConnectionInfo;
use query::{HeightResponse, QueryRequest, QueryResponse, QueryResponseWire};

#[cfg(test)]
use mockall::automock;

/// Failures talking to the chain service
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("chain service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no progress: next_block {next_block} <= from_block {from_block}")]
    NoProgress { from_block: u64, next_block: u64 },
}

impl ChainError {
    /// Whether retrying the same request can succeed. Auth and request-shape errors cannot.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } | Self::Transport(_) | Self::Malformed(_) | Self::NoProgress { .. } => true,
        }
    }
}

/// Remote contract the ingestion pipeline requires
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current chain head
    async fn height(&self) -> Result<u64, ChainError>;

    /// All data matching the request in `[from_block, to_block)`, possibly cut short at `next_block`
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ChainError>;
}

pub struct HypersyncClient {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HypersyncClient {
    /// Create a new client for the specified endpoint
    pub fn new(endpoint: String, bearer_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let endpoint = endpoint.trim_end_matches('/').to_string();

        Ok(Self { client, endpoint, bearer_token })
    }

    /// Get the endpoint URL this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get connection information for display
    pub async fn get_connection_info(&self) -> Result<ConnectionInfo> {
        let height = self.height().await.context("Failed to get chain height")?;

        Ok(ConnectionInfo { endpoint: self.endpoint.clone(), height, checked_at: Utc::now() })
    }

    /// Test the connection
    pub async fn test_connection(&self) -> Result<()> {
        self.height().await.context("Failed to connect to HyperSync endpoint")?;
        Ok(())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn map_error(&self, e: reqwest::Error) -> ChainError {
        if e.is_timeout() {
            ChainError::Timeout { endpoint: self.endpoint.clone() }
        } else {
            ChainError::Transport(e.to_string())
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, ChainError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        if !status.is_success() {
            return Err(ChainError::Status { status: status.as_u16(), body });
        }

        Ok(body)
    }
}

#[async_trait]
impl ChainSource for HypersyncClient {
    async fn height(&self) -> Result<u64, ChainError> {
        let url = format!("{}/height", self.endpoint);
        let response = self.authorized(self.client.get(&url)).send().await.map_err(|e| self.map_error(e))?;
        let body = self.read_body(response).await?;

        parse_height(&body)
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ChainError> {
        tracing::debug!(from_block = request.from_block, to_block = request.to_block, "Querying HyperSync");

        let url = format!("{}/query", self.endpoint);
        let response =
            self.authorized(self.client.post(&url).json(request)).send().await.map_err(|e| self.map_error(e))?;
        let body = self.read_body(response).await?;

        let response = parse_query_response(&body)?;
        if response.dropped_items > 0 {
            tracing::debug!(dropped = response.dropped_items, "Dropped incomplete items from HyperSync response");
        }

        Ok(response)
    }
}

fn parse_height(body: &str) -> Result<u64, ChainError> {
    let parsed: HeightResponse =
        serde_json::from_str(body).map_err(|e| ChainError::Malformed(format!("height: {}", e)))?;

    parsed.height.to_u64().ok_or_else(|| ChainError::Malformed("height is not a block number".to_string()))
}

fn parse_query_response(body: &str) -> Result<QueryResponse, ChainError> {
    let wire: QueryResponseWire =
        serde_json::from_str(body).map_err(|e| ChainError::Malformed(format!("query: {}", e)))?;

    wire.into_response().ok_or_else(|| ChainError::Malformed("next_block is not a block number".to_string()))
}
