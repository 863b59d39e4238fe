//! Contract Gateway
//!
//! Typed, per-chain read and write operations against the EggNS name registry.
//!
//! - Names and addresses are validated before any network call.
//! - Reads retry transport failures with exponential backoff, invalidating the failed
//!   endpoint so the provider pool can fail over between attempts.
//! - Writes are submitted once from the configured signer and never retried.

use async_trait::async_trait;
use ethereum_types::U256;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::retry::{AttemptError, RetryPolicy};
use crate::chains::abi;
use crate::chains::provider_pool::{ChainHandle, ChainProviderPool};
use crate::chains::registry::{self, RegistryError};
use crate::chains::rpc::TransactionRequest;
use crate::config::EggnsConfig;
use crate::error::{EggnsError, Result};
use crate::name::normalize_name;
use crate::types::{NameRecord, NetworkId, SubmittedTransaction};

/// Parameters of a `registerName` write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterNameRequest {
    pub name: String,
    pub resolved_address: String,
    /// bytes32 hex; zero hash when absent
    pub content_hash: Option<String>,
    /// Value sent with the transaction, in wei
    pub fee: U256,
}

/// Registry operations used by the orchestrator and the consistency checker.
#[async_trait]
pub trait NameRegistryApi: Send + Sync {
    async fn is_name_available(&self, network_id: NetworkId, name: &str) -> Result<bool>;

    /// Reads the full record of `name` on `network_id`.
    ///
    /// # Arguments
    ///
    /// * `network_id` - Chain to read from
    /// * `name` - Name as typed; normalized before the call
    ///
    /// # Returns
    ///
    /// * `Ok(Some(NameRecord))` - The registered record
    /// * `Ok(None)` - The name is not registered on `network_id`
    /// * `Err(EggnsError)` - Invalid name, unavailable chain or failed call
    async fn resolve_name(&self, network_id: NetworkId, name: &str)
        -> Result<Option<NameRecord>>;

    /// Availability as the negation of `resolve_name` over the same read.
    async fn check_name_availability(&self, network_id: NetworkId, name: &str) -> Result<bool> {
        Ok(self.resolve_name(network_id, name).await?.is_none())
    }

    /// Owner from `getNameData`, `None` when the name does not exist.
    async fn get_name_owner(&self, network_id: NetworkId, name: &str) -> Result<Option<String>>;

    async fn get_owner_names(&self, network_id: NetworkId, owner: &str) -> Result<Vec<String>>;

    /// Registers a name on `network_id`, paying the fee in `request`.
    ///
    /// # Returns
    ///
    /// * `Ok(SubmittedTransaction)` - Hash and receipt of the mined registration
    /// * `Err(EggnsError::RegistrationReverted)` - Rejected, not mined, or reverted
    async fn register_name(
        &self,
        network_id: NetworkId,
        request: &RegisterNameRequest,
    ) -> Result<SubmittedTransaction>;

    async fn transfer_name(
        &self,
        network_id: NetworkId,
        name: &str,
        new_owner: &str,
    ) -> Result<SubmittedTransaction>;

    async fn renew_name(
        &self,
        network_id: NetworkId,
        name: &str,
        renewal_fee: U256,
    ) -> Result<SubmittedTransaction>;

    /// Current fee in wei as a decimal string.
    async fn get_registration_fee(&self, network_id: NetworkId) -> Result<String>;

    async fn get_renewal_fee(&self, network_id: NetworkId) -> Result<String>;

    /// Registry contract address on `network_id`.
    fn registry_address(&self, network_id: NetworkId) -> Result<String>;

    /// Account that signs writes.
    fn signer_address(&self) -> String;
}

/// [`NameRegistryApi`] backed by JSON-RPC through the provider pool.
pub struct ContractGateway {
    pool: Arc<ChainProviderPool>,
    retry: RetryPolicy,
    signer: String,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl ContractGateway {
    pub fn new(
        pool: Arc<ChainProviderPool>,
        retry: RetryPolicy,
        signer: &str,
        receipt_poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            retry,
            signer: signer.to_lowercase(),
            receipt_poll_interval,
            receipt_timeout,
        }
    }

    pub fn from_config(pool: Arc<ChainProviderPool>, config: &EggnsConfig) -> Self {
        Self::new(
            pool,
            RetryPolicy::from_config(&config.service),
            &config.signer.address,
            config.service.receipt_poll_interval(),
            config.service.receipt_timeout(),
        )
    }

    /// Runs a registry read under the retry policy.
    ///
    /// Only a transport failure on a connected endpoint is retried: the endpoint is
    /// invalidated so the next attempt reselects. A pool error means selection already
    /// tried every endpoint (or the chain is cached unavailable) and is returned at once.
    async fn read<T, F, Fut>(&self, network_id: NetworkId, method: &str, call: F) -> Result<T>
    where
        F: Fn(Arc<ChainHandle>) -> Fut,
        Fut: Future<Output = std::result::Result<T, RegistryError>>,
    {
        let pool = &self.pool;
        let call = &call;
        self.retry
            .run_attempts(method, move || async move {
                let handle = pool
                    .get_provider(network_id)
                    .await
                    .map_err(AttemptError::Fatal)?;
                let endpoint = handle.endpoint.clone();
                match call(handle).await {
                    Ok(value) => Ok(value),
                    Err(RegistryError::Rpc(e)) if e.is_transport() => {
                        pool.invalidate(network_id, &endpoint).await;
                        Err(AttemptError::Retryable(EggnsError::ChainUnavailable {
                            network_id,
                            reason: e.to_string(),
                        }))
                    }
                    Err(e) => Err(AttemptError::Fatal(EggnsError::ContractCall {
                        network_id,
                        method: method.to_string(),
                        reason: e.to_string(),
                    })),
                }
            })
            .await
    }

    /// Submits a registry write and waits for its receipt.
    async fn send(
        &self,
        network_id: NetworkId,
        method: &str,
        data: Vec<u8>,
        value: Option<U256>,
    ) -> Result<SubmittedTransaction> {
        let handle = self.pool.get_provider(network_id).await?;
        let tx = TransactionRequest {
            from: self.signer.clone(),
            to: handle.registry.address().to_string(),
            data: format!("0x{}", hex::encode(data)),
            value,
            gas: None,
        };
        info!(
            "Submitting {} on network {} (registry {})",
            method,
            network_id,
            handle.registry.address()
        );

        let transaction_hash = match handle.rpc.send_transaction(&tx).await {
            Ok(hash) => hash,
            Err(e) if e.is_transport() => {
                self.pool.invalidate(network_id, &handle.endpoint).await;
                return Err(EggnsError::ChainUnavailable {
                    network_id,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                return Err(EggnsError::RegistrationReverted {
                    network_id,
                    method: method.to_string(),
                    reason: e.to_string(),
                    transaction_hash: None,
                })
            }
        };

        let receipt = handle
            .rpc
            .wait_for_receipt(&transaction_hash, self.receipt_poll_interval, self.receipt_timeout)
            .await
            .map_err(|e| EggnsError::RegistrationReverted {
                network_id,
                method: method.to_string(),
                reason: format!("mining failed: {}", e),
                transaction_hash: Some(transaction_hash.clone()),
            })?;

        if !receipt.status {
            warn!("{} reverted on network {}: {}", method, network_id, transaction_hash);
            return Err(EggnsError::RegistrationReverted {
                network_id,
                method: method.to_string(),
                reason: "transaction reverted".to_string(),
                transaction_hash: Some(transaction_hash),
            });
        }

        info!("{} mined on network {}: {}", method, network_id, transaction_hash);
        Ok(SubmittedTransaction {
            transaction_hash,
            receipt,
        })
    }
}

fn parse_account(address: &str) -> Result<[u8; 20]> {
    abi::parse_address(address).map_err(|_| EggnsError::InvalidAddress(address.to_string()))
}

#[async_trait]
impl NameRegistryApi for ContractGateway {
    async fn is_name_available(&self, network_id: NetworkId, name: &str) -> Result<bool> {
        let name = normalize_name(name)?;
        self.read(network_id, "isNameAvailable", |handle| {
            let name = name.clone();
            async move { handle.registry.is_name_available(&name).await }
        })
        .await
    }

    async fn resolve_name(
        &self,
        network_id: NetworkId,
        name: &str,
    ) -> Result<Option<NameRecord>> {
        let name = normalize_name(name)?;
        self.read(network_id, "getNameRecord", |handle| {
            let name = name.clone();
            async move { handle.registry.get_name_record(&name).await }
        })
        .await
    }

    async fn get_name_owner(&self, network_id: NetworkId, name: &str) -> Result<Option<String>> {
        let name = normalize_name(name)?;
        self.read(network_id, "getNameData", |handle| {
            let name = name.clone();
            async move { handle.registry.get_name_owner(&name).await }
        })
        .await
    }

    async fn get_owner_names(&self, network_id: NetworkId, owner: &str) -> Result<Vec<String>> {
        let owner = parse_account(owner)?;
        self.read(network_id, "getOwnerNames", |handle| async move {
            handle.registry.get_owner_names(&owner).await
        })
        .await
    }

    async fn register_name(
        &self,
        network_id: NetworkId,
        request: &RegisterNameRequest,
    ) -> Result<SubmittedTransaction> {
        let name = normalize_name(&request.name)?;
        let resolved = parse_account(&request.resolved_address)?;
        let content_hash = match &request.content_hash {
            Some(hash) => abi::parse_bytes32(hash)
                .map_err(|e| EggnsError::InvalidRequest(format!("content hash: {}", e)))?,
            None => [0u8; 32],
        };

        let data = registry::encode_register_name(&name, &resolved, &content_hash);
        self.send(network_id, "registerName", data, Some(request.fee))
            .await
    }

    async fn transfer_name(
        &self,
        network_id: NetworkId,
        name: &str,
        new_owner: &str,
    ) -> Result<SubmittedTransaction> {
        let name = normalize_name(name)?;
        let new_owner = parse_account(new_owner)?;
        let data = registry::encode_transfer_name(&name, &new_owner);
        self.send(network_id, "transferName", data, None).await
    }

    async fn renew_name(
        &self,
        network_id: NetworkId,
        name: &str,
        renewal_fee: U256,
    ) -> Result<SubmittedTransaction> {
        let name = normalize_name(name)?;
        let data = registry::encode_renew_name(&name);
        self.send(network_id, "renewName", data, Some(renewal_fee))
            .await
    }

    async fn get_registration_fee(&self, network_id: NetworkId) -> Result<String> {
        let fee = self
            .read(network_id, "registrationFee", |handle| async move {
                handle.registry.registration_fee().await
            })
            .await?;
        Ok(fee.to_string())
    }

    async fn get_renewal_fee(&self, network_id: NetworkId) -> Result<String> {
        let fee = self
            .read(network_id, "renewalFee", |handle| async move {
                handle.registry.renewal_fee().await
            })
            .await?;
        Ok(fee.to_string())
    }

    fn registry_address(&self, network_id: NetworkId) -> Result<String> {
        Ok(self.pool.chain_info(network_id)?.contract_address.clone())
    }

    fn signer_address(&self) -> String {
        self.signer.clone()
    }
}
