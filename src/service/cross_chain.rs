//! Cross-chain name service.
//!
//! Flows built on the gateways besides the registration protocol:
//! - bridging an existing native record to another chain (`createBridgedName` message)
//! - transferring a name and propagating the new owner to a destination chain
//! - claiming or waiting on tracked operations

use ethereum_types::U256;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::bridge_gateway::{self, BridgeAndCallRequest, BridgeApi};
use super::contract_gateway::NameRegistryApi;
use super::tracker::OperationTracker;
use crate::chains::{abi, registry};
use crate::error::{EggnsError, Result};
use crate::name::normalize_name;
use crate::types::{
    BridgeTransaction, NameRecord, NetworkId, OperationStatus, OperationType,
    SubmittedTransaction,
};

/// Bridge submission together with the tracked operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedBridge {
    pub operation_id: Uuid,
    pub bridge: BridgeTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossChainTransfer {
    pub operation_id: Uuid,
    pub transfer: SubmittedTransaction,
    pub bridge: BridgeTransaction,
}

pub struct CrossChainNameService {
    registry: Arc<dyn NameRegistryApi>,
    bridge: Arc<dyn BridgeApi>,
    tracker: Arc<OperationTracker>,
    force_update_global_exit_root: bool,
}

impl CrossChainNameService {
    pub fn new(
        registry: Arc<dyn NameRegistryApi>,
        bridge: Arc<dyn BridgeApi>,
        tracker: Arc<OperationTracker>,
        force_update_global_exit_root: bool,
    ) -> Self {
        Self {
            registry,
            bridge,
            tracker,
            force_update_global_exit_root,
        }
    }

    /// Native record on `source`, refusing bridged copies.
    async fn bridgeable_record(&self, name: &str, source: NetworkId) -> Result<NameRecord> {
        let record = self
            .registry
            .resolve_name(source, name)
            .await?
            .ok_or_else(|| EggnsError::NameNotFound {
                name: name.to_string(),
                network_id: source,
            })?;
        if record.is_bridged() {
            return Err(EggnsError::BridgedNameNotBridgeable(name.to_string()));
        }
        Ok(record)
    }

    fn check_route(source: NetworkId, destination: NetworkId) -> Result<()> {
        if source == destination {
            return Err(EggnsError::InvalidRequest(
                "source and destination networks must differ".to_string(),
            ));
        }
        Ok(())
    }

    async fn mark_failed(&self, operation_id: Uuid) {
        if let Err(e) = self
            .tracker
            .update_status(operation_id, OperationStatus::Failed)
            .await
        {
            warn!("Could not update operation {}: {}", operation_id, e);
        }
    }

    async fn mark_bridged(&self, operation_id: Uuid, bridge_tx_hash: &str) {
        if let Err(e) = self
            .tracker
            .set_bridge_transaction(operation_id, bridge_tx_hash)
            .await
        {
            warn!("Could not update operation {}: {}", operation_id, e);
        }
    }

    /// Copies a native record to `destination` with a `createBridgedName` message to the
    /// destination registry.
    ///
    /// # Arguments
    ///
    /// * `name` - Name as typed
    /// * `source` - Network holding the native record
    /// * `destination` - Network to copy the record to
    ///
    /// # Returns
    ///
    /// * `Ok(TrackedBridge)` - Bridge transaction and the id of its tracked operation
    /// * `Err(EggnsError)` - Same network, missing or bridged record, or failed submission
    pub async fn bridge_name_to_chain(
        &self,
        name: &str,
        source: NetworkId,
        destination: NetworkId,
    ) -> Result<TrackedBridge> {
        let name = normalize_name(name)?;
        Self::check_route(source, destination)?;
        let record = self.bridgeable_record(&name, source).await?;
        let destination_registry = self.registry.registry_address(destination)?;
        let metadata = registry::encode_create_bridged_name(&record, source)
            .map_err(|e| EggnsError::InvalidRequest(format!("record encoding: {}", e)))?;

        let operation_id = self
            .tracker
            .record(OperationType::Bridge, &name, source, destination)
            .await;
        let bridge = match self
            .bridge
            .bridge_message(
                source,
                destination,
                &destination_registry,
                self.force_update_global_exit_root,
                metadata,
            )
            .await
        {
            Ok(bridge) => bridge,
            Err(e) => {
                self.mark_failed(operation_id).await;
                return Err(e);
            }
        };
        self.mark_bridged(operation_id, &bridge.transaction_hash).await;

        info!(
            "Bridged '{}' from network {} to {}: {}",
            name, source, destination, bridge.transaction_hash
        );
        Ok(TrackedBridge {
            operation_id,
            bridge,
        })
    }

    /// Same record copy carried by `bridgeAndCall` with `amount` of the native token; the
    /// owner is credited if the destination call reverts.
    pub async fn bridge_name_with_value(
        &self,
        name: &str,
        source: NetworkId,
        destination: NetworkId,
        amount: U256,
    ) -> Result<TrackedBridge> {
        let name = normalize_name(name)?;
        Self::check_route(source, destination)?;
        let record = self.bridgeable_record(&name, source).await?;
        let destination_registry = self.registry.registry_address(destination)?;
        let call_data = registry::encode_create_bridged_name(&record, source)
            .map_err(|e| EggnsError::InvalidRequest(format!("record encoding: {}", e)))?;

        let operation_id = self
            .tracker
            .record(OperationType::Bridge, &name, source, destination)
            .await;
        let request = BridgeAndCallRequest {
            source_network: source,
            destination_network: destination,
            call_address: destination_registry,
            fallback_address: record.owner.clone(),
            call_data,
            force_update_global_exit_root: self.force_update_global_exit_root,
            amount: Some(amount),
            token: None,
        };
        let bridge = match self.bridge.bridge_and_call(request).await {
            Ok(bridge) => bridge,
            Err(e) => {
                self.mark_failed(operation_id).await;
                return Err(e);
            }
        };
        self.mark_bridged(operation_id, &bridge.transaction_hash).await;

        Ok(TrackedBridge {
            operation_id,
            bridge,
        })
    }

    /// Transfers `name` on `source` and sends the new owner to the destination registry
    /// as a `receiveBridgedName` message.
    ///
    /// The name must exist, be active and be native on `source`.
    ///
    /// # Returns
    ///
    /// * `Ok(CrossChainTransfer)` - Source transfer and the propagation bridge
    /// * `Err(EggnsError::PartialTransfer)` - The transfer is mined but propagation failed
    /// * `Err(EggnsError)` - Validation or source transfer failed; nothing changed
    pub async fn transfer_name_cross_chain(
        &self,
        name: &str,
        new_owner: &str,
        source: NetworkId,
        destination: NetworkId,
    ) -> Result<CrossChainTransfer> {
        let name = normalize_name(name)?;
        let new_owner_bytes = abi::parse_address(new_owner)
            .map_err(|_| EggnsError::InvalidAddress(new_owner.to_string()))?;
        Self::check_route(source, destination)?;

        let record = self.bridgeable_record(&name, source).await?;
        if !record.is_active {
            return Err(EggnsError::NameInactive {
                name,
                network_id: source,
            });
        }
        let destination_registry = self.registry.registry_address(destination)?;

        let operation_id = self
            .tracker
            .record(OperationType::Transfer, &name, source, destination)
            .await;

        let transfer = match self
            .registry
            .transfer_name(source, &name, new_owner)
            .await
        {
            Ok(transfer) => transfer,
            Err(e) => {
                self.mark_failed(operation_id).await;
                return Err(e);
            }
        };

        let message = registry::encode_receive_bridged_name(&name, &new_owner_bytes);
        let bridge = match self
            .bridge
            .bridge_message(
                source,
                destination,
                &destination_registry,
                self.force_update_global_exit_root,
                message,
            )
            .await
        {
            Ok(bridge) => bridge,
            Err(e) => {
                warn!(
                    "'{}' transferred on network {} ({}) but propagation failed: {}",
                    name, source, transfer.transaction_hash, e
                );
                self.mark_failed(operation_id).await;
                return Err(EggnsError::PartialTransfer {
                    name,
                    network_id: source,
                    transaction_hash: transfer.transaction_hash,
                    reason: e.to_string(),
                });
            }
        };
        self.mark_bridged(operation_id, &bridge.transaction_hash).await;

        Ok(CrossChainTransfer {
            operation_id,
            transfer,
            bridge,
        })
    }

    /// Claims the bridge message of a tracked operation on its destination.
    pub async fn claim_operation(&self, operation_id: Uuid) -> Result<BridgeTransaction> {
        let operation = self
            .tracker
            .get(operation_id)
            .await
            .ok_or(EggnsError::OperationNotFound(operation_id))?;
        let bridge_tx_hash = operation.bridge_transaction_hash.ok_or_else(|| {
            EggnsError::InvalidRequest(format!(
                "operation {} has no bridge transaction",
                operation_id
            ))
        })?;

        match self
            .bridge
            .claim_message(
                &bridge_tx_hash,
                operation.source_network,
                operation.destination_network,
            )
            .await
        {
            Ok(claim) => {
                self.tracker
                    .update_status(operation_id, OperationStatus::Claimed)
                    .await?;
                info!("Claimed operation {}: {}", operation_id, claim.transaction_hash);
                Ok(claim)
            }
            Err(e @ EggnsError::AlreadyClaimed { .. }) => {
                self.tracker
                    .update_status(operation_id, OperationStatus::Claimed)
                    .await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Waits until the operation's bridge deposit is claimable.
    pub async fn wait_for_operation(
        &self,
        operation_id: Uuid,
        interval: Duration,
        timeout: Duration,
    ) -> Result<bool> {
        let operation = self
            .tracker
            .get(operation_id)
            .await
            .ok_or(EggnsError::OperationNotFound(operation_id))?;
        let bridge_tx_hash = operation.bridge_transaction_hash.ok_or_else(|| {
            EggnsError::InvalidRequest(format!(
                "operation {} has no bridge transaction",
                operation_id
            ))
        })?;

        Ok(bridge_gateway::wait_for_global_exit_root_update(
            self.bridge.as_ref(),
            &bridge_tx_hash,
            operation.source_network,
            interval,
            timeout,
        )
        .await)
    }
}
