//! Bridge Gateway
//!
//! Cross-chain message construction and submission over the LxLy bridge.
//!
//! Bridge operation lifecycle:
//! 1. **Pending**: `bridgeMessage` / `bridgeAndCall` mined on the source chain.
//! 2. **ReadyToClaim**: the source exit root reached the destination; the proof service
//!    marks the deposit `ready_for_claim`.
//! 3. **Completed**: a claim transaction executed on the destination.
//!
//! A reverted bridge transaction is **Failed** and terminal. Recovery means submitting a
//! fresh operation.

use async_trait::async_trait;
use chrono::Utc;
use ethereum_types::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chains::abi::{self, AbiReader, Token};
use crate::chains::proof_api::{ProofApiClient, ProofApiError};
use crate::chains::provider_pool::{ChainHandle, ChainProviderPool};
use crate::chains::rpc::{RpcError, TransactionRequest};
use crate::config::{BridgeConfig, EggnsConfig};
use crate::error::{EggnsError, Result};
use crate::types::{BridgeStatus, BridgeTransaction, NetworkId, TransactionReceipt, ZERO_ADDRESS};

pub const BRIDGE_MESSAGE: &str = "bridgeMessage(uint32,address,bool,bytes)";
pub const BRIDGE_AND_CALL: &str =
    "bridgeAndCall(address,uint256,uint32,address,address,bytes,bool)";
pub const CLAIM_MESSAGE: &str =
    "claimMessage(bytes32[32],bytes32[32],uint256,bytes32,bytes32,uint32,address,uint32,address,uint256,bytes)";
pub const CLAIM_ASSET: &str =
    "claimAsset(bytes32[32],bytes32[32],uint256,bytes32,bytes32,uint32,address,uint32,address,uint256,bytes)";
pub const BRIDGE_EVENT: &str =
    "BridgeEvent(uint8,uint32,address,uint32,address,uint256,bytes,uint32)";

/// Leaf type of an asset deposit.
pub const LEAF_TYPE_ASSET: u8 = 0;
/// Leaf type of a message deposit.
pub const LEAF_TYPE_MESSAGE: u8 = 1;

const PROOF_DEPTH: usize = 32;

/// Parameters of a `bridgeAndCall` submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeAndCallRequest {
    pub source_network: NetworkId,
    pub destination_network: NetworkId,
    /// Contract invoked on the destination
    pub call_address: String,
    /// Credited instead when the destination call reverts
    pub fallback_address: String,
    pub call_data: Vec<u8>,
    pub force_update_global_exit_root: bool,
    /// Amount bridged alongside the call, in wei or token units
    pub amount: Option<U256>,
    /// ERC20 token, `None` for the native token
    pub token: Option<String>,
}

/// Bridge operations used by the orchestrator and the claim flows.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    /// Submits an opaque payload for relay to `destination_address`. Does not wait for
    /// destination execution.
    ///
    /// # Arguments
    ///
    /// * `source_network` - Network the deposit is made on
    /// * `destination_network` - Network the message is relayed to
    /// * `destination_address` - Contract that receives the message
    /// * `force_update_global_exit_root` - Update the exit root in the same transaction
    /// * `metadata` - Payload handed to the destination contract
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeTransaction)` - Mined deposit, status `Pending`
    /// * `Err(EggnsError::BridgeSubmission)` - Rejected or reverted, with the hash if mined
    async fn bridge_message(
        &self,
        source_network: NetworkId,
        destination_network: NetworkId,
        destination_address: &str,
        force_update_global_exit_root: bool,
        metadata: Vec<u8>,
    ) -> Result<BridgeTransaction>;

    async fn bridge_and_call(&self, request: BridgeAndCallRequest) -> Result<BridgeTransaction>;

    /// Claims the message deposit of `bridge_tx_hash` on the destination.
    ///
    /// When the same transaction also deposited an asset, the asset is claimed first.
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeTransaction)` - Mined claim, status `Completed`
    /// * `Err(EggnsError::ProofNotReady)` - The exit root does not include the deposit yet
    /// * `Err(EggnsError::AlreadyClaimed)` - The deposit was claimed by someone else
    async fn claim_message(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Result<BridgeTransaction>;

    /// Claims the asset deposit of `bridge_tx_hash` on the destination.
    async fn claim_asset(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Result<BridgeTransaction>;

    async fn get_bridge_transaction_status(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
    ) -> Result<BridgeStatus>;

    /// True when `address` holds contract code on `network_id`.
    async fn is_contract_deployed(&self, network_id: NetworkId, address: &str) -> Result<bool>;
}

// ============================================================================
// DEPOSITS AND CLAIM PAYLOADS
// ============================================================================

/// Decoded `BridgeEvent` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDeposit {
    pub leaf_type: u8,
    pub origin_network: NetworkId,
    pub origin_address: [u8; 20],
    pub destination_network: NetworkId,
    pub destination_address: [u8; 20],
    pub amount: U256,
    pub metadata: Vec<u8>,
    pub deposit_count: u32,
}

/// Every `BridgeEvent` in a receipt, in log order.
pub fn decode_bridge_events(receipt: &TransactionReceipt) -> Result<Vec<BridgeDeposit>> {
    let topic = abi::event_topic(BRIDGE_EVENT);
    receipt
        .logs
        .iter()
        .filter(|log| log.topics.first().map(|t| t.as_str()) == Some(topic.as_str()))
        .map(|log| {
            decode_bridge_event_data(&log.data)
                .map_err(|e| EggnsError::BridgeQuery(format!("undecodable BridgeEvent: {}", e)))
        })
        .collect()
}

fn decode_bridge_event_data(data: &str) -> std::result::Result<BridgeDeposit, abi::AbiError> {
    let reader = AbiReader::from_hex(data)?;
    let address = |index| -> std::result::Result<[u8; 20], abi::AbiError> {
        abi::parse_address(&reader.address(index)?)
    };
    let leaf_type = reader.u32(0)?;
    Ok(BridgeDeposit {
        leaf_type: u8::try_from(leaf_type)
            .map_err(|_| abi::AbiError::Overflow(leaf_type.to_string()))?,
        origin_network: reader.u32(1)?,
        origin_address: address(2)?,
        destination_network: reader.u32(3)?,
        destination_address: address(4)?,
        amount: reader.uint(5)?,
        metadata: reader.bytes(6)?,
        deposit_count: reader.u32(7)?,
    })
}

/// Deposit of `leaf_type` in the receipt.
pub fn find_deposit(receipt: &TransactionReceipt, leaf_type: u8) -> Result<BridgeDeposit> {
    decode_bridge_events(receipt)?
        .into_iter()
        .find(|d| d.leaf_type == leaf_type)
        .ok_or_else(|| {
            EggnsError::BridgeQuery(format!(
                "no BridgeEvent with leaf type {} in {}",
                leaf_type, receipt.transaction_hash
            ))
        })
}

/// Deposit that carries the cross-chain call: the message leaf when present.
pub fn primary_deposit(receipt: &TransactionReceipt) -> Result<BridgeDeposit> {
    let deposits = decode_bridge_events(receipt)?;
    if let Some(message) = deposits.iter().find(|d| d.leaf_type == LEAF_TYPE_MESSAGE) {
        return Ok(message.clone());
    }
    deposits.into_iter().next().ok_or_else(|| {
        EggnsError::BridgeQuery(format!("no BridgeEvent in {}", receipt.transaction_hash))
    })
}

/// Global index of a deposit: mainnet deposits set bit 64, rollup deposits carry the
/// rollup index above bit 32.
pub fn compute_global_index(source_network: NetworkId, deposit_count: u32) -> U256 {
    let count = U256::from(deposit_count);
    if source_network == 0 {
        count + (U256::one() << 64)
    } else {
        count + (U256::from(source_network - 1) << 32)
    }
}

/// Arguments of `claimMessage` / `claimAsset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPayload {
    pub smt_proof_local_exit_root: Vec<[u8; 32]>,
    pub smt_proof_rollup_exit_root: Vec<[u8; 32]>,
    pub global_index: U256,
    pub mainnet_exit_root: [u8; 32],
    pub rollup_exit_root: [u8; 32],
    pub deposit: BridgeDeposit,
}

impl ClaimPayload {
    pub fn to_tokens(&self) -> Vec<Token> {
        let proof = |words: &[[u8; 32]]| {
            Token::FixedArray(words.iter().map(|w| Token::FixedBytes(*w)).collect())
        };
        vec![
            proof(&self.smt_proof_local_exit_root),
            proof(&self.smt_proof_rollup_exit_root),
            Token::Uint(self.global_index),
            Token::FixedBytes(self.mainnet_exit_root),
            Token::FixedBytes(self.rollup_exit_root),
            Token::Uint(U256::from(self.deposit.origin_network)),
            Token::Address(self.deposit.origin_address),
            Token::Uint(U256::from(self.deposit.destination_network)),
            Token::Address(self.deposit.destination_address),
            Token::Uint(self.deposit.amount),
            Token::Bytes(self.deposit.metadata.clone()),
        ]
    }
}

fn parse_proof(words: &[String]) -> Result<Vec<[u8; 32]>> {
    if words.len() != PROOF_DEPTH {
        return Err(EggnsError::BridgeQuery(format!(
            "expected {} proof entries, got {}",
            PROOF_DEPTH,
            words.len()
        )));
    }
    words
        .iter()
        .map(|w| {
            abi::parse_bytes32(w)
                .map_err(|e| EggnsError::BridgeQuery(format!("proof entry: {}", e)))
        })
        .collect()
}

fn proof_error(err: ProofApiError) -> EggnsError {
    EggnsError::BridgeQuery(err.to_string())
}

// ============================================================================
// LXLY GATEWAY
// ============================================================================

/// [`BridgeApi`] over the LxLy bridge contracts and the bridge proof service.
pub struct LxlyBridgeGateway {
    pool: Arc<ChainProviderPool>,
    proof_api: ProofApiClient,
    signer: String,
    gas_limit: u64,
    claim_poll_interval: Duration,
    claim_timeout: Duration,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl LxlyBridgeGateway {
    pub fn new(
        pool: Arc<ChainProviderPool>,
        proof_api: ProofApiClient,
        signer: &str,
        bridge: &BridgeConfig,
        receipt_poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            proof_api,
            signer: signer.to_lowercase(),
            gas_limit: bridge.gas_limit,
            claim_poll_interval: bridge.claim_poll_interval(),
            claim_timeout: bridge.claim_timeout(),
            receipt_poll_interval,
            receipt_timeout,
        }
    }

    pub fn from_config(pool: Arc<ChainProviderPool>, config: &EggnsConfig) -> Result<Self> {
        let proof_api =
            ProofApiClient::new(&config.bridge.proof_api_url, config.service.request_timeout())
                .map_err(proof_error)?;
        Ok(Self::new(
            pool,
            proof_api,
            &config.signer.address,
            &config.bridge,
            config.service.receipt_poll_interval(),
            config.service.receipt_timeout(),
        ))
    }

    /// Polls readiness at the configured interval; `timeout` defaults to the configured
    /// claim timeout.
    pub async fn wait_for_global_exit_root_update(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        timeout: Option<Duration>,
    ) -> bool {
        wait_for_global_exit_root_update(
            self,
            bridge_tx_hash,
            source_network,
            self.claim_poll_interval,
            timeout.unwrap_or(self.claim_timeout),
        )
        .await
    }

    /// Sends a bridge transaction from the signer and waits for its receipt.
    ///
    /// # Arguments
    ///
    /// * `handle` - Connected chain to send on
    /// * `to` - Bridge or bridge extension address
    /// * `data` - ABI-encoded call
    /// * `value` - Native amount attached to the call
    /// * `label` - Call name used in logs and errors
    ///
    /// # Returns
    ///
    /// * `Ok((tx_hash, receipt))` - Mined and not reverted
    /// * `Err(EggnsError::ChainUnavailable)` - Transport failure before the hash was known
    /// * `Err(EggnsError::BridgeSubmission)` - Rejected, not mined in time, or reverted
    async fn submit(
        &self,
        handle: &ChainHandle,
        to: &str,
        data: Vec<u8>,
        value: Option<U256>,
        label: &str,
    ) -> Result<(String, TransactionReceipt)> {
        let network_id = handle.info.network_id;
        let tx = TransactionRequest {
            from: self.signer.clone(),
            to: to.to_string(),
            data: format!("0x{}", hex::encode(data)),
            value,
            gas: Some(self.gas_limit),
        };
        info!("Submitting {} on network {} to {}", label, network_id, to);

        let tx_hash = match handle.rpc.send_transaction(&tx).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => return Err(self.submission_error(handle, e).await),
        };

        let receipt = handle
            .rpc
            .wait_for_receipt(&tx_hash, self.receipt_poll_interval, self.receipt_timeout)
            .await
            .map_err(|e| EggnsError::BridgeSubmission {
                network_id,
                reason: format!("{} mining failed: {}", label, e),
                transaction_hash: Some(tx_hash.clone()),
            })?;

        if !receipt.status {
            warn!("{} reverted on network {}: {}", label, network_id, tx_hash);
            return Err(EggnsError::BridgeSubmission {
                network_id,
                reason: format!("{} reverted", label),
                transaction_hash: Some(tx_hash),
            });
        }

        info!("{} mined on network {}: {}", label, network_id, tx_hash);
        Ok((tx_hash, receipt))
    }

    /// Transport failures drop the endpoint so the next call reselects a provider.
    async fn submission_error(&self, handle: &ChainHandle, err: RpcError) -> EggnsError {
        let network_id = handle.info.network_id;
        if err.is_transport() {
            self.pool.invalidate(network_id, &handle.endpoint).await;
            EggnsError::ChainUnavailable {
                network_id,
                reason: err.to_string(),
            }
        } else {
            EggnsError::BridgeSubmission {
                network_id,
                reason: err.to_string(),
                transaction_hash: None,
            }
        }
    }

    async fn source_receipt(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
    ) -> Result<Option<TransactionReceipt>> {
        let handle = self.pool.get_provider(source_network).await?;
        match handle.rpc.get_transaction_receipt(bridge_tx_hash).await {
            Ok(receipt) => Ok(receipt),
            Err(e) if e.is_transport() => {
                self.pool.invalidate(source_network, &handle.endpoint).await;
                Err(EggnsError::ChainUnavailable {
                    network_id: source_network,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(EggnsError::BridgeQuery(format!(
                "receipt for {}: {}",
                bridge_tx_hash, e
            ))),
        }
    }

    /// Collects everything needed to claim the `leaf_type` deposit of `bridge_tx_hash`.
    ///
    /// # Arguments
    ///
    /// * `bridge_tx_hash` - Deposit transaction on the source
    /// * `source_network` - Network the deposit was made on
    /// * `leaf_type` - `LEAF_TYPE_ASSET` or `LEAF_TYPE_MESSAGE`
    ///
    /// # Returns
    ///
    /// * `Ok(ClaimPayload)` - Proofs, exit roots and deposit fields for the claim call
    /// * `Err(EggnsError::ProofNotReady)` - Not mined, not indexed or not ready yet
    /// * `Err(EggnsError::AlreadyClaimed)` - The proof service reports a claim
    pub async fn build_payload_for_claim(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        leaf_type: u8,
    ) -> Result<ClaimPayload> {
        let not_ready = |reason: &str| EggnsError::ProofNotReady {
            transaction_hash: bridge_tx_hash.to_string(),
            reason: reason.to_string(),
        };

        let receipt = self
            .source_receipt(bridge_tx_hash, source_network)
            .await?
            .ok_or_else(|| not_ready("bridge transaction not mined"))?;
        if !receipt.status {
            return Err(EggnsError::BridgeQuery(format!(
                "bridge transaction {} reverted",
                bridge_tx_hash
            )));
        }
        let deposit = find_deposit(&receipt, leaf_type)?;

        let indexed = self
            .proof_api
            .get_deposit(source_network, u64::from(deposit.deposit_count))
            .await
            .map_err(proof_error)?
            .ok_or_else(|| not_ready("deposit not indexed by the bridge service yet"))?;
        if indexed.is_claimed() {
            return Err(EggnsError::AlreadyClaimed {
                transaction_hash: bridge_tx_hash.to_string(),
                claim_transaction_hash: indexed.claim_tx_hash,
            });
        }
        if !indexed.ready_for_claim {
            return Err(not_ready("global exit root not yet propagated to destination"));
        }

        let proof = self
            .proof_api
            .get_merkle_proof(source_network, u64::from(deposit.deposit_count))
            .await
            .map_err(proof_error)?;
        let bytes32 = |value: &str| {
            abi::parse_bytes32(value)
                .map_err(|e| EggnsError::BridgeQuery(format!("exit root: {}", e)))
        };

        Ok(ClaimPayload {
            smt_proof_local_exit_root: parse_proof(&proof.merkle_proof)?,
            smt_proof_rollup_exit_root: parse_proof(&proof.rollup_merkle_proof)?,
            global_index: compute_global_index(source_network, deposit.deposit_count),
            mainnet_exit_root: bytes32(&proof.main_exit_root)?,
            rollup_exit_root: bytes32(&proof.rollup_exit_root)?,
            deposit,
        })
    }

    async fn claim(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
        leaf_type: u8,
    ) -> Result<BridgeTransaction> {
        let destination = self.pool.get_provider(destination_network).await?;
        if leaf_type == LEAF_TYPE_MESSAGE {
            self.claim_companion_asset(bridge_tx_hash, source_network, &destination)
                .await?;
        }
        self.claim_deposit(bridge_tx_hash, source_network, &destination, leaf_type)
            .await
    }

    /// `bridgeAndCall` emits an asset deposit ahead of its message; the message can only
    /// execute once the asset has been claimed on the destination.
    async fn claim_companion_asset(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination: &ChainHandle,
    ) -> Result<()> {
        let receipt = match self.source_receipt(bridge_tx_hash, source_network).await? {
            Some(receipt) => receipt,
            None => return Ok(()),
        };
        let deposits = decode_bridge_events(&receipt)?;
        let has_asset = deposits.iter().any(|d| d.leaf_type == LEAF_TYPE_ASSET);
        let has_message = deposits.iter().any(|d| d.leaf_type == LEAF_TYPE_MESSAGE);
        if !(has_asset && has_message) {
            return Ok(());
        }

        match self
            .claim_deposit(bridge_tx_hash, source_network, destination, LEAF_TYPE_ASSET)
            .await
        {
            Ok(claim) => {
                info!(
                    "Claimed asset deposit of {} in {}",
                    bridge_tx_hash, claim.transaction_hash
                );
                Ok(())
            }
            Err(EggnsError::AlreadyClaimed { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn claim_deposit(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination: &ChainHandle,
        leaf_type: u8,
    ) -> Result<BridgeTransaction> {
        let destination_network = destination.info.network_id;
        let (signature, label) = if leaf_type == LEAF_TYPE_MESSAGE {
            (CLAIM_MESSAGE, "claimMessage")
        } else {
            (CLAIM_ASSET, "claimAsset")
        };
        let payload = self
            .build_payload_for_claim(bridge_tx_hash, source_network, leaf_type)
            .await?;
        if payload.deposit.destination_network != destination_network {
            return Err(EggnsError::InvalidRequest(format!(
                "deposit targets network {}, not {}",
                payload.deposit.destination_network, destination_network
            )));
        }

        let data = abi::encode_call(signature, &payload.to_tokens());
        let bridge_address = destination.info.bridge_address.clone();
        let (transaction_hash, receipt) = self
            .submit(destination, &bridge_address, data, None, label)
            .await?;

        Ok(BridgeTransaction {
            transaction_hash,
            receipt,
            source_network_id: source_network,
            destination_network_id: destination_network,
            destination_address: abi::format_address(&payload.deposit.destination_address),
            status: BridgeStatus::Completed,
            timestamp: Utc::now(),
            call_data: Some(format!("0x{}", hex::encode(&payload.deposit.metadata))),
            amount: Some(payload.deposit.amount),
            token: Some(abi::format_address(&payload.deposit.origin_address)),
        })
    }
}

fn parse_account(address: &str) -> Result<[u8; 20]> {
    abi::parse_address(address).map_err(|_| EggnsError::InvalidAddress(address.to_string()))
}

#[async_trait]
impl BridgeApi for LxlyBridgeGateway {
    async fn bridge_message(
        &self,
        source_network: NetworkId,
        destination_network: NetworkId,
        destination_address: &str,
        force_update_global_exit_root: bool,
        metadata: Vec<u8>,
    ) -> Result<BridgeTransaction> {
        let destination = parse_account(destination_address)?;
        self.pool.chain_info(destination_network)?;
        let source = self.pool.get_provider(source_network).await?;

        let data = abi::encode_call(
            BRIDGE_MESSAGE,
            &[
                Token::Uint(U256::from(destination_network)),
                Token::Address(destination),
                Token::Bool(force_update_global_exit_root),
                Token::Bytes(metadata.clone()),
            ],
        );
        let bridge_address = source.info.bridge_address.clone();
        let (transaction_hash, receipt) = self
            .submit(&source, &bridge_address, data, None, "bridgeMessage")
            .await?;

        Ok(BridgeTransaction {
            transaction_hash,
            receipt,
            source_network_id: source_network,
            destination_network_id: destination_network,
            destination_address: abi::format_address(&destination),
            status: BridgeStatus::Pending,
            timestamp: Utc::now(),
            call_data: Some(format!("0x{}", hex::encode(&metadata))),
            amount: None,
            token: None,
        })
    }

    async fn bridge_and_call(&self, request: BridgeAndCallRequest) -> Result<BridgeTransaction> {
        let call_address = parse_account(&request.call_address)?;
        let fallback_address = parse_account(&request.fallback_address)?;
        let token = parse_account(request.token.as_deref().unwrap_or(ZERO_ADDRESS))?;
        let amount = request.amount.unwrap_or_default();
        self.pool.chain_info(request.destination_network)?;
        let source = self.pool.get_provider(request.source_network).await?;

        let data = abi::encode_call(
            BRIDGE_AND_CALL,
            &[
                Token::Address(token),
                Token::Uint(amount),
                Token::Uint(U256::from(request.destination_network)),
                Token::Address(call_address),
                Token::Address(fallback_address),
                Token::Bytes(request.call_data.clone()),
                Token::Bool(request.force_update_global_exit_root),
            ],
        );
        // Native token amounts travel as transaction value
        let value = if request.token.is_none() {
            Some(amount)
        } else {
            None
        };
        let extension_address = source.info.bridge_extension_address.clone();
        let (transaction_hash, receipt) = self
            .submit(&source, &extension_address, data, value, "bridgeAndCall")
            .await?;

        Ok(BridgeTransaction {
            transaction_hash,
            receipt,
            source_network_id: request.source_network,
            destination_network_id: request.destination_network,
            destination_address: abi::format_address(&call_address),
            status: BridgeStatus::Pending,
            timestamp: Utc::now(),
            call_data: Some(format!("0x{}", hex::encode(&request.call_data))),
            amount: Some(amount),
            token: Some(abi::format_address(&token)),
        })
    }

    async fn claim_message(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Result<BridgeTransaction> {
        self.claim(bridge_tx_hash, source_network, destination_network, LEAF_TYPE_MESSAGE)
            .await
    }

    async fn claim_asset(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Result<BridgeTransaction> {
        self.claim(bridge_tx_hash, source_network, destination_network, LEAF_TYPE_ASSET)
            .await
    }

    async fn get_bridge_transaction_status(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
    ) -> Result<BridgeStatus> {
        let receipt = match self.source_receipt(bridge_tx_hash, source_network).await? {
            Some(receipt) => receipt,
            None => return Ok(BridgeStatus::Pending),
        };
        if !receipt.status {
            return Ok(BridgeStatus::Failed);
        }

        let deposit = primary_deposit(&receipt)?;
        let indexed = self
            .proof_api
            .get_deposit(source_network, u64::from(deposit.deposit_count))
            .await
            .map_err(proof_error)?;

        let status = match indexed {
            None => BridgeStatus::Pending,
            Some(d) if d.is_claimed() => BridgeStatus::Completed,
            Some(d) if d.ready_for_claim => BridgeStatus::ReadyToClaim,
            Some(_) => BridgeStatus::Pending,
        };
        debug!("Bridge {} status: {}", bridge_tx_hash, status);
        Ok(status)
    }

    async fn is_contract_deployed(&self, network_id: NetworkId, address: &str) -> Result<bool> {
        parse_account(address)?;
        let handle = self.pool.get_provider(network_id).await?;
        let code = match handle.rpc.get_code(address).await {
            Ok(code) => code,
            Err(e) if e.is_transport() => {
                self.pool.invalidate(network_id, &handle.endpoint).await;
                return Err(EggnsError::ChainUnavailable {
                    network_id,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                return Err(EggnsError::ContractCall {
                    network_id,
                    method: "eth_getCode".to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let code = code.trim_start_matches("0x");
        Ok(!code.is_empty() && code.chars().any(|c| c != '0'))
    }
}

// ============================================================================
// CLAIM READINESS POLLING
// ============================================================================

/// Outcome of waiting for a deposit to become claimable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimReadiness {
    /// Ready to claim, or already claimed
    Ready,
    /// The bridge transaction reverted
    Failed,
    TimedOut,
    Cancelled,
}

/// Polls `get_bridge_transaction_status` every `interval` until the deposit is ready,
/// fails, `timeout` elapses, or `cancel` fires. Query errors are logged and polling
/// continues at the same interval.
///
/// # Arguments
///
/// * `bridge` - Status source
/// * `bridge_tx_hash` - Deposit transaction on the source
/// * `source_network` - Network the deposit was made on
/// * `interval` - Pause between polls
/// * `timeout` - Overall deadline, also enforced while a query is in flight
/// * `cancel` - Stops polling early
///
/// # Returns
///
/// * `ClaimReadiness::Ready` - Claimable or already claimed
/// * `ClaimReadiness::Failed` - The deposit transaction reverted
/// * `ClaimReadiness::TimedOut` or `ClaimReadiness::Cancelled` - Stopped before an answer
pub async fn poll_claim_readiness(
    bridge: &dyn BridgeApi,
    bridge_tx_hash: &str,
    source_network: NetworkId,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ClaimReadiness {
    let deadline = Instant::now() + timeout;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let status = tokio::select! {
            _ = cancel.cancelled() => return ClaimReadiness::Cancelled,
            _ = tokio::time::sleep_until(deadline) => return ClaimReadiness::TimedOut,
            status = bridge.get_bridge_transaction_status(bridge_tx_hash, source_network) => status,
        };

        match status {
            Ok(BridgeStatus::ReadyToClaim) | Ok(BridgeStatus::Completed) => {
                info!("Bridge {} ready to claim after {} polls", bridge_tx_hash, polls);
                return ClaimReadiness::Ready;
            }
            Ok(BridgeStatus::Failed) => {
                warn!("Bridge {} failed", bridge_tx_hash);
                return ClaimReadiness::Failed;
            }
            Ok(BridgeStatus::Pending) => {
                debug!("Bridge {} still pending (poll {})", bridge_tx_hash, polls);
            }
            Err(e) => {
                warn!("Bridge {} status query failed: {}", bridge_tx_hash, e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return ClaimReadiness::TimedOut;
        }
        let pause = interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => return ClaimReadiness::Cancelled,
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

/// True once the deposit is claimable; false on failure or timeout.
pub async fn wait_for_global_exit_root_update(
    bridge: &dyn BridgeApi,
    bridge_tx_hash: &str,
    source_network: NetworkId,
    interval: Duration,
    timeout: Duration,
) -> bool {
    let cancel = CancellationToken::new();
    poll_claim_readiness(bridge, bridge_tx_hash, source_network, interval, timeout, &cancel).await
        == ClaimReadiness::Ready
}

/// Background readiness poll that the caller can abandon.
pub struct ExitRootWatch {
    cancel: CancellationToken,
    task: Option<JoinHandle<ClaimReadiness>>,
}

impl ExitRootWatch {
    pub fn spawn(
        bridge: Arc<dyn BridgeApi>,
        bridge_tx_hash: String,
        source_network: NetworkId,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            poll_claim_readiness(
                bridge.as_ref(),
                &bridge_tx_hash,
                source_network,
                interval,
                timeout,
                &token,
            )
            .await
        });
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Stops polling; `outcome` then resolves to `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn outcome(mut self) -> ClaimReadiness {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(ClaimReadiness::Cancelled),
            None => ClaimReadiness::Cancelled,
        }
    }
}

impl Drop for ExitRootWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
