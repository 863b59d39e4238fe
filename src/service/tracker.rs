//! Operation Tracker Service
//!
//! Session-local ledger of cross-chain operations, newest first and capped.
//!
//! Flow:
//! 1. **Pending**: the orchestrator records the operation before its first write.
//! 2. **Bridged**: the bridge transaction hash is known (`set_bridge_transaction`).
//! 3. **Claimed**: the claim transaction executed on the destination.
//!
//! Any step can move an operation to **Failed**. Every update matches on the operation
//! id assigned at creation, so concurrent operations for the same name never cross.

use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EggnsError, Result};
use crate::types::{CrossChainOperation, NetworkId, OperationStatus, OperationType};

/// In-memory operation history.
pub struct OperationTracker {
    /// Newest first
    operations: RwLock<VecDeque<CrossChainOperation>>,
    capacity: usize,
}

impl OperationTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            operations: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records a new pending operation and returns its id.
    ///
    /// The oldest entry is dropped once the list is at capacity.
    pub async fn record(
        &self,
        operation_type: OperationType,
        name: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Uuid {
        let operation = CrossChainOperation {
            id: Uuid::new_v4(),
            operation_type,
            name: name.to_string(),
            source_network,
            destination_network,
            bridge_transaction_hash: None,
            status: OperationStatus::Pending,
            timestamp: Utc::now(),
        };
        let id = operation.id;

        let mut operations = self.operations.write().await;
        operations.push_front(operation);
        operations.truncate(self.capacity);

        info!(
            "Tracking {:?} of '{}' ({} -> {}) as {}",
            operation_type, name, source_network, destination_network, id
        );
        id
    }

    /// Sets the status of operation `id`.
    pub async fn update_status(&self, id: Uuid, status: OperationStatus) -> Result<()> {
        let mut operations = self.operations.write().await;
        let operation = operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(EggnsError::OperationNotFound(id))?;

        debug!("Operation {}: {} -> {}", id, operation.status, status);
        operation.status = status;
        Ok(())
    }

    /// Attaches the bridge transaction hash and marks the operation bridged.
    pub async fn set_bridge_transaction(&self, id: Uuid, bridge_tx_hash: &str) -> Result<()> {
        let mut operations = self.operations.write().await;
        let operation = operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(EggnsError::OperationNotFound(id))?;

        operation.bridge_transaction_hash = Some(bridge_tx_hash.to_string());
        operation.status = OperationStatus::Bridged;
        info!("Operation {} bridged: {}", id, bridge_tx_hash);
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Option<CrossChainOperation> {
        self.operations
            .read()
            .await
            .iter()
            .find(|op| op.id == id)
            .cloned()
    }

    /// Lookup for callers that only hold a bridge transaction hash.
    pub async fn find_by_bridge_hash(&self, bridge_tx_hash: &str) -> Option<CrossChainOperation> {
        self.operations
            .read()
            .await
            .iter()
            .find(|op| {
                op.bridge_transaction_hash
                    .as_deref()
                    .is_some_and(|hash| hash.eq_ignore_ascii_case(bridge_tx_hash))
            })
            .cloned()
    }

    /// Snapshot, newest first.
    pub async fn operations(&self) -> Vec<CrossChainOperation> {
        self.operations.read().await.iter().cloned().collect()
    }

    /// Operations that may still need a manual claim: pending or bridged.
    pub async fn pending_claims(&self) -> Vec<CrossChainOperation> {
        self.operations
            .read()
            .await
            .iter()
            .filter(|op| {
                matches!(
                    op.status,
                    OperationStatus::Pending | OperationStatus::Bridged
                )
            })
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.operations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.operations.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.operations.write().await.clear();
    }
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new(10)
    }
}
