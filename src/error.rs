//! Error Types
//!
//! Error taxonomy shared by the gateways, the orchestrator and the consistency checker.
//! Configuration loading and the CLI use `anyhow`; everything that crosses a component
//! boundary uses [`EggnsError`] so callers can match on the failure kind.

use thiserror::Error;

use crate::types::NetworkId;

/// Errors surfaced by the EggNS cross-chain core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EggnsError {
    /// Name failed local format validation. No network call was made.
    #[error("Invalid name format '{name}': {reason}")]
    InvalidNameFormat { name: String, reason: String },

    /// An account address failed format validation. No network call was made.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// The requested network id is not in the configured chain list.
    #[error("Unsupported network id: {0}")]
    UnsupportedChain(NetworkId),

    /// Every configured endpoint for a chain failed, or a transport error occurred.
    #[error("Chain {network_id} unavailable: {reason}")]
    ChainUnavailable { network_id: NetworkId, reason: String },

    /// A read reverted or returned data that could not be decoded.
    #[error("Contract call {method} failed on network {network_id}: {reason}")]
    ContractCall {
        network_id: NetworkId,
        method: String,
        reason: String,
    },

    /// A write transaction reverted, or submitting/mining it failed.
    #[error("Transaction {method} reverted on network {network_id}: {reason}")]
    RegistrationReverted {
        network_id: NetworkId,
        method: String,
        reason: String,
        transaction_hash: Option<String>,
    },

    #[error("Name '{0}' is not available")]
    NameNotAvailable(String),

    /// The destination registry already holds the name.
    #[error("Name already registered on destination chain")]
    DestinationCollision { name: String, network_id: NetworkId },

    /// The source exit root has not reached the destination yet.
    #[error("Bridge deposit {transaction_hash} is not ready to claim: {reason}")]
    ProofNotReady {
        transaction_hash: String,
        reason: String,
    },

    /// The bridge call failed before any destination state changed.
    #[error("Bridge submission failed on network {network_id}: {reason}")]
    BridgeSubmission {
        network_id: NetworkId,
        reason: String,
        transaction_hash: Option<String>,
    },

    /// The deposit was claimed before; claiming again would revert.
    #[error("Bridge deposit {transaction_hash} already claimed in {claim_transaction_hash}")]
    AlreadyClaimed {
        transaction_hash: String,
        claim_transaction_hash: String,
    },

    /// The source transfer mined but the ownership message to the destination failed.
    /// The source chain already reflects the new owner.
    #[error(
        "Name '{name}' transferred on network {network_id} in {transaction_hash} but propagation failed: {reason}"
    )]
    PartialTransfer {
        name: String,
        network_id: NetworkId,
        transaction_hash: String,
        reason: String,
    },

    #[error("Cannot bridge a bridged name: '{0}'")]
    BridgedNameNotBridgeable(String),

    #[error("Name '{name}' not found on network {network_id}")]
    NameNotFound { name: String, network_id: NetworkId },

    #[error("Name '{name}' is not active on network {network_id}")]
    NameInactive { name: String, network_id: NetworkId },

    #[error("Operation {0} not found")]
    OperationNotFound(uuid::Uuid),

    /// The bridge proof service or a bridge status read failed.
    #[error("Bridge query failed: {0}")]
    BridgeQuery(String),

    /// Request parameters are inconsistent (e.g. source equals destination).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl EggnsError {
    /// Only transport-level failures are worth retrying, and only on read paths.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EggnsError::ChainUnavailable { .. })
    }

    /// Transaction hash already obtained before the failure, if any.
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            EggnsError::RegistrationReverted {
                transaction_hash, ..
            }
            | EggnsError::BridgeSubmission {
                transaction_hash, ..
            } => transaction_hash.as_deref(),
            EggnsError::ProofNotReady {
                transaction_hash, ..
            }
            | EggnsError::PartialTransfer {
                transaction_hash, ..
            } => Some(transaction_hash.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EggnsError>;
