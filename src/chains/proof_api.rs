//! Bridge proof service client.
//!
//! The bridge service indexes deposits and serves the Merkle proofs needed to claim
//! them on the destination chain:
//! - `GET /bridge?net_id=..&deposit_cnt=..` returns the deposit and its readiness
//! - `GET /merkle-proof?deposit_cnt=..&net_id=..` returns the local and rollup proofs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::NetworkId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProofApiError {
    #[error("proof service request failed: {0}")]
    Transport(String),
    #[error("proof service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed proof service response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProofApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProofApiError::Malformed(err.to_string())
        } else {
            ProofApiError::Transport(err.to_string())
        }
    }
}

/// Deposit as indexed by the bridge service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Deposit {
    #[serde(default)]
    pub leaf_type: u8,
    #[serde(default)]
    pub deposit_cnt: u64,
    #[serde(default)]
    pub network_id: NetworkId,
    #[serde(default)]
    pub dest_net: NetworkId,
    #[serde(default)]
    pub tx_hash: String,
    /// Set once the claim transaction has been seen on the destination
    #[serde(default)]
    pub claim_tx_hash: String,
    #[serde(default)]
    pub ready_for_claim: bool,
    #[serde(default)]
    pub global_index: String,
}

impl Deposit {
    pub fn is_claimed(&self) -> bool {
        !self.claim_tx_hash.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct DepositResponse {
    deposit: Deposit,
}

/// Merkle proofs for a deposit.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MerkleProof {
    pub merkle_proof: Vec<String>,
    pub rollup_merkle_proof: Vec<String>,
    pub main_exit_root: String,
    pub rollup_exit_root: String,
}

#[derive(Debug, Deserialize)]
struct MerkleProofResponse {
    proof: MerkleProof,
}

/// HTTP client for the bridge proof service.
#[derive(Debug, Clone)]
pub struct ProofApiClient {
    client: Client,
    base_url: String,
}

impl ProofApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProofApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| ProofApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Deposit `deposit_count` from `network_id`, `None` while not yet indexed.
    pub async fn get_deposit(
        &self,
        network_id: NetworkId,
        deposit_count: u64,
    ) -> Result<Option<Deposit>, ProofApiError> {
        let url = format!("{}/bridge", self.base_url);
        debug!("GET {} net_id={} deposit_cnt={}", url, network_id, deposit_count);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("net_id", network_id.to_string()),
                ("deposit_cnt", deposit_count.to_string()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProofApiError::Status { status, body });
        }

        let body: DepositResponse = response.json().await?;
        Ok(Some(body.deposit))
    }

    pub async fn get_merkle_proof(
        &self,
        network_id: NetworkId,
        deposit_count: u64,
    ) -> Result<MerkleProof, ProofApiError> {
        let url = format!("{}/merkle-proof", self.base_url);
        debug!("GET {} net_id={} deposit_cnt={}", url, network_id, deposit_count);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("deposit_cnt", deposit_count.to_string()),
                ("net_id", network_id.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProofApiError::Status { status, body });
        }

        let body: MerkleProofResponse = response.json().await?;
        Ok(body.proof)
    }
}
