//! EVM JSON-RPC Client
//!
//! Minimal JSON-RPC transport used for every chain interaction: liveness probes,
//! contract reads (`eth_call`), code checks, transaction submission from the configured
//! signer and receipt polling.

use ethereum_types::U256;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{ReceiptLog, TransactionReceipt};

/// Transport-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Connection refused, DNS failure, non-2xx HTTP status
    #[error("transport error: {0}")]
    Transport(String),
    /// JSON-RPC error object (reverts arrive here)
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// Response body or result could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

impl RpcError {
    /// True when the endpoint itself is the problem, as opposed to the call.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::Timeout(_))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout(err.to_string())
        } else if err.is_decode() {
            RpcError::Malformed(err.to_string())
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

/// EVM JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// EVM JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Transaction sent with `eth_sendTransaction`; the node signs for `from`.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_quantity")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_gas")]
    pub gas: Option<u64>,
}

fn serialize_quantity<S: serde::Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&format!("0x{:x}", v)),
        None => serializer.serialize_none(),
    }
}

fn serialize_gas<S: serde::Serializer>(
    value: &Option<u64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&format!("0x{:x}", v)),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    status: Option<String>,
    #[serde(rename = "gasUsed", default)]
    gas_used: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

pub fn parse_hex_u64(value: &str) -> Result<u64, RpcError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("invalid quantity '{}': {}", value, e)))
}

impl TryFrom<RawReceipt> for TransactionReceipt {
    type Error = RpcError;

    fn try_from(raw: RawReceipt) -> Result<Self, RpcError> {
        Ok(TransactionReceipt {
            transaction_hash: raw.transaction_hash,
            block_number: raw.block_number.as_deref().map(parse_hex_u64).transpose()?.unwrap_or(0),
            status: raw.status.as_deref().map(parse_hex_u64).transpose()? == Some(1),
            gas_used: raw.gas_used.as_deref().map(parse_hex_u64).transpose()?.unwrap_or(0),
            logs: raw
                .logs
                .into_iter()
                .map(|log| ReceiptLog {
                    address: log.address.to_lowercase(),
                    topics: log.topics.into_iter().map(|t| t.to_lowercase()).collect(),
                    data: log.data,
                })
                .collect(),
        })
    }
}

/// JSON-RPC client bound to one endpoint.
#[derive(Debug)]
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for `url` with the given HTTP timeout.
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .no_proxy() // Avoid macOS system-configuration issues in tests
            .build()
            .map_err(|e| RpcError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Option<T>, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!("JSON-RPC {} -> {}", method, self.url);

        let response = self.client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(RpcError::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }
        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(format!("{}: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result)
    }

    /// Sends a request whose result must be present.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, RpcError> {
        self.request_optional(method, params)
            .await?
            .ok_or_else(|| RpcError::Malformed(format!("{} returned no result", method)))
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let block_hex: String = self.request("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&block_hex)
    }

    /// Read-only contract call against the latest block; returns the raw hex result.
    pub async fn call(&self, to: &str, data: &[u8]) -> Result<String, RpcError> {
        let params = vec![
            serde_json::json!({
                "to": to,
                "data": format!("0x{}", hex::encode(data)),
            }),
            serde_json::json!("latest"),
        ];
        self.request("eth_call", params).await
    }

    pub async fn get_code(&self, address: &str) -> Result<String, RpcError> {
        self.request(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }

    /// Submits a transaction and returns its hash.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        let params = vec![serde_json::to_value(tx)
            .map_err(|e| RpcError::Malformed(format!("transaction encoding: {}", e)))?];
        self.request("eth_sendTransaction", params).await
    }

    /// Receipt for `tx_hash`, `None` while the transaction is not mined.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        let raw: Option<RawReceipt> = self
            .request_optional("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
            .await?;
        raw.map(TransactionReceipt::try_from).transpose()
    }

    /// Polls for a receipt until it appears or `timeout` elapses.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TransactionReceipt, RpcError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() + poll_interval > deadline {
                return Err(RpcError::Timeout(format!(
                    "no receipt for {} after {:?}",
                    tx_hash, timeout
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
