//! Domain Types
//!
//! Records read from the name registries and the bookkeeping types produced by the
//! bridge layer and the operation tracker.

use chrono::{DateTime, Utc};
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bridge network id (0 for the L1, rollup index otherwise).
pub type NetworkId = u32;

/// All-zero address, used as the native token and as "no owner".
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// All-zero bytes32, used when no content hash is set.
pub const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

// ============================================================================
// NAME RECORDS
// ============================================================================

/// Where a record was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Registered directly on this chain.
    Native,
    /// Created by an incoming bridge call from another network.
    Bridged { origin_network: NetworkId },
}

/// A name's state on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Lowercase name, unique per chain
    pub name: String,
    /// Owner address (lowercase hex)
    pub owner: String,
    /// Address the name points to
    pub resolved_address: String,
    /// Expiration as unix seconds
    pub expiration_time: u64,
    pub is_active: bool,
    /// Opaque bytes32, 0x-prefixed
    pub content_hash: String,
    /// Network the record was read from
    pub network_id: NetworkId,
    pub origin: RecordOrigin,
}

impl NameRecord {
    pub fn is_bridged(&self) -> bool {
        matches!(self.origin, RecordOrigin::Bridged { .. })
    }

    /// Origin network of a bridged record, `None` for native records.
    pub fn origin_network(&self) -> Option<NetworkId> {
        match self.origin {
            RecordOrigin::Bridged { origin_network } => Some(origin_network),
            RecordOrigin::Native => None,
        }
    }

    /// Expiry is derived from the clock; the record itself never changes.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        i64::try_from(self.expiration_time)
            .map(|expiration| now.timestamp() >= expiration)
            .unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Log entry from a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

/// Mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    /// True when the transaction executed without reverting
    pub status: bool,
    pub gas_used: u64,
    pub logs: Vec<ReceiptLog>,
}

/// Result of a registry write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub transaction_hash: String,
    pub receipt: TransactionReceipt,
}

/// Lifecycle of a bridge deposit: `Pending -> ReadyToClaim -> Completed`, or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Pending,
    ReadyToClaim,
    Completed,
    Failed,
}

impl std::fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BridgeStatus::Pending => "pending",
            BridgeStatus::ReadyToClaim => "ready_to_claim",
            BridgeStatus::Completed => "completed",
            BridgeStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of any bridge-layer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTransaction {
    pub transaction_hash: String,
    pub receipt: TransactionReceipt,
    pub source_network_id: NetworkId,
    pub destination_network_id: NetworkId,
    pub destination_address: String,
    pub status: BridgeStatus,
    pub timestamp: DateTime<Utc>,
    /// Call data carried to the destination (hex)
    pub call_data: Option<String>,
    pub amount: Option<U256>,
    /// Bridged token, `None` for plain messages
    pub token: Option<String>,
}

// ============================================================================
// OPERATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Register,
    Bridge,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Bridged,
    Claimed,
    Completed,
    Failed,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Bridged => "bridged",
            OperationStatus::Claimed => "claimed",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One in-flight multi-chain action, kept in memory for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainOperation {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub name: String,
    pub source_network: NetworkId,
    pub destination_network: NetworkId,
    pub bridge_transaction_hash: Option<String>,
    pub status: OperationStatus,
    pub timestamp: DateTime<Utc>,
}
